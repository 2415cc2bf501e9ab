//! Field validation helpers shared by the repository and API layers.

use crate::models::ContactFields;

/// Reject a blank (empty or whitespace-only) required field.
///
/// Returns Ok(()) if valid, Err with a message naming the field otherwise.
pub fn require_non_blank(field: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is a required field and must not be blank", field));
    }
    Ok(())
}

/// Validate the four required scalar fields of a contact create/update.
pub fn validate_contact_fields(fields: &ContactFields) -> std::result::Result<(), String> {
    require_non_blank("name", &fields.name)?;
    require_non_blank("email", &fields.email)?;
    require_non_blank("phone", &fields.phone)?;
    require_non_blank("address", &fields.address)?;
    Ok(())
}

/// Validate a tag name.
///
/// Rules:
/// - non-blank
/// - at most 100 characters
///
/// Duplicate names are allowed on purpose; tags are not deduplicated.
pub fn validate_tag_name(name: &str) -> std::result::Result<(), String> {
    if name.trim().is_empty() {
        return Err("Tag name is required".to_string());
    }
    if name.len() > 100 {
        return Err("Tag name must be 100 characters or less".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ContactFields {
        ContactFields {
            name: "Jane Doe".to_string(),
            email: "jane@x.com".to_string(),
            phone: "5551234567".to_string(),
            address: "1 Main St".to_string(),
            group_id: 1,
        }
    }

    #[test]
    fn test_valid_fields_pass() {
        assert!(validate_contact_fields(&fields()).is_ok());
    }

    #[test]
    fn test_each_blank_field_is_rejected() {
        for blank in ["", "   ", "\t\n"] {
            let mut f = fields();
            f.name = blank.to_string();
            assert!(validate_contact_fields(&f).is_err(), "name {:?}", blank);

            let mut f = fields();
            f.email = blank.to_string();
            assert!(validate_contact_fields(&f).is_err(), "email {:?}", blank);

            let mut f = fields();
            f.phone = blank.to_string();
            assert!(validate_contact_fields(&f).is_err(), "phone {:?}", blank);

            let mut f = fields();
            f.address = blank.to_string();
            assert!(validate_contact_fields(&f).is_err(), "address {:?}", blank);
        }
    }

    #[test]
    fn test_error_message_names_the_field() {
        let err = require_non_blank("phone", "  ").unwrap_err();
        assert!(err.contains("phone"));
    }

    #[test]
    fn test_tag_name_rules() {
        assert!(validate_tag_name("VIP").is_ok());
        assert!(validate_tag_name("").is_err());
        assert!(validate_tag_name("   ").is_err());
        assert!(validate_tag_name(&"x".repeat(101)).is_err());
        assert!(validate_tag_name(&"x".repeat(100)).is_ok());
    }
}
