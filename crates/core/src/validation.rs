//! Input validation for request intake and other user-submitted text.
//!
//! Every rule that can reject user input without consulting the store lives
//! here, so the HTTP layer can report a precise 400 before touching the
//! database.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::model::{NewServiceRequest, Profile};
use crate::types::{EmailError, PriceError, Priority};

/// Maximum photos attached to one request.
pub const MAX_PHOTOS: usize = 5;

/// Maximum size of a single photo, in bytes.
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

/// Photo content types accepted at intake.
pub const ACCEPTED_PHOTO_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

/// Maximum chat message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4000;

/// Reasons user input is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("at most {max} photos can be attached")]
    TooManyPhotos { max: usize },

    #[error("photo {index} must be a JPEG or PNG image, got {content_type}")]
    UnsupportedPhotoType { index: usize, content_type: String },

    #[error("photo {index} is larger than {max_bytes} bytes")]
    PhotoTooLarge { index: usize, max_bytes: usize },

    #[error("message must be at most {max} characters")]
    MessageTooLong { max: usize },

    #[error("cannot send a direct message to yourself")]
    SelfAddressed,

    #[error(transparent)]
    Price(#[from] PriceError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Trim `value` and reject it when nothing is left.
///
/// # Errors
///
/// Returns [`ValidationError::Required`] naming `field` for blank input.
pub fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(trimmed.to_owned())
}

/// An uploaded photo before it is encoded for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    /// Encode as a `data:` URL.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

/// A request as submitted by a client, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRequestInput {
    pub description: String,
    pub priority: Priority,
    pub photos: Vec<PhotoUpload>,
}

impl NewRequestInput {
    /// Check the intake rules without consuming the input.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn validate(&self) -> Result<(), ValidationError> {
        required("description", &self.description)?;

        if self.photos.len() > MAX_PHOTOS {
            return Err(ValidationError::TooManyPhotos { max: MAX_PHOTOS });
        }

        for (index, photo) in self.photos.iter().enumerate() {
            if !ACCEPTED_PHOTO_TYPES.contains(&photo.content_type.as_str()) {
                return Err(ValidationError::UnsupportedPhotoType {
                    index,
                    content_type: photo.content_type.clone(),
                });
            }
            if photo.bytes.len() > MAX_PHOTO_BYTES {
                return Err(ValidationError::PhotoTooLarge {
                    index,
                    max_bytes: MAX_PHOTO_BYTES,
                });
            }
        }

        Ok(())
    }

    /// Validate and turn the input into a storable request owned by `client`.
    ///
    /// # Errors
    ///
    /// Returns the first intake rule the input breaks.
    pub fn into_new_request(self, client: &Profile) -> Result<NewServiceRequest, ValidationError> {
        self.validate()?;

        Ok(NewServiceRequest {
            client_id: client.id,
            client_name: client.name.clone(),
            description: self.description.trim().to_owned(),
            priority: self.priority,
            photos: self.photos.iter().map(PhotoUpload::to_data_url).collect(),
        })
    }
}

/// Normalize chat message text.
///
/// # Errors
///
/// Rejects blank text and text over [`MAX_MESSAGE_CHARS`].
pub fn message_text(text: &str) -> Result<String, ValidationError> {
    let text = required("message", text)?;
    if text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ValidationError::MessageTooLong {
            max: MAX_MESSAGE_CHARS,
        });
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{Email, Role, UserId};

    fn jpeg(len: usize) -> PhotoUpload {
        PhotoUpload {
            content_type: "image/jpeg".to_owned(),
            bytes: vec![0xff; len],
        }
    }

    fn client() -> Profile {
        Profile {
            id: UserId::random(),
            role: Role::Client,
            name: "Carla".to_owned(),
            email: Email::parse("carla@example.com").unwrap(),
            phone: String::new(),
            address: "12 Elm St".to_owned(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_description_required() {
        let input = NewRequestInput {
            description: "   ".to_owned(),
            ..NewRequestInput::default()
        };
        assert_eq!(
            input.validate(),
            Err(ValidationError::Required {
                field: "description"
            })
        );
    }

    #[test]
    fn test_six_photos_rejected() {
        let input = NewRequestInput {
            description: "leaky faucet".to_owned(),
            photos: vec![jpeg(10); 6],
            ..NewRequestInput::default()
        };
        assert_eq!(
            input.validate(),
            Err(ValidationError::TooManyPhotos { max: 5 })
        );
    }

    #[test]
    fn test_gif_rejected() {
        let input = NewRequestInput {
            description: "leaky faucet".to_owned(),
            photos: vec![
                jpeg(10),
                PhotoUpload {
                    content_type: "image/gif".to_owned(),
                    bytes: vec![1, 2, 3],
                },
            ],
            ..NewRequestInput::default()
        };
        assert!(matches!(
            input.validate(),
            Err(ValidationError::UnsupportedPhotoType { index: 1, .. })
        ));
    }

    #[test]
    fn test_oversized_photo_rejected() {
        let input = NewRequestInput {
            description: "leaky faucet".to_owned(),
            photos: vec![jpeg(MAX_PHOTO_BYTES), jpeg(MAX_PHOTO_BYTES + 1)],
            ..NewRequestInput::default()
        };
        assert_eq!(
            input.validate(),
            Err(ValidationError::PhotoTooLarge {
                index: 1,
                max_bytes: MAX_PHOTO_BYTES
            })
        );
    }

    #[test]
    fn test_into_new_request_encodes_photos() {
        let profile = client();
        let input = NewRequestInput {
            description: "  leaky faucet ".to_owned(),
            priority: Priority::High,
            photos: vec![PhotoUpload {
                content_type: "image/png".to_owned(),
                bytes: b"abc".to_vec(),
            }],
        };

        let request = input.into_new_request(&profile).unwrap();
        assert_eq!(request.client_id, profile.id);
        assert_eq!(request.client_name, "Carla");
        assert_eq!(request.description, "leaky faucet");
        assert_eq!(request.photos, vec!["data:image/png;base64,YWJj".to_owned()]);
    }

    #[test]
    fn test_message_text_trims_and_limits() {
        assert_eq!(message_text("  hi  ").unwrap(), "hi");
        assert!(message_text("\n\t").is_err());
        assert_eq!(
            message_text(&"x".repeat(MAX_MESSAGE_CHARS + 1)),
            Err(ValidationError::MessageTooLong {
                max: MAX_MESSAGE_CHARS
            })
        );
    }
}
