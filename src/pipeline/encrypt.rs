//! Best-effort PDF password protection.
//!
//! [`protect`] never fails: whatever goes wrong (unparseable input, an
//! already-encrypted document, a panic inside the PDF library) the caller
//! gets the original bytes back with `applied = false`, and a warning is
//! logged.
//!
//! Documents are protected with the standard security handler, revision 3
//! (128-bit RC4), which every mainstream viewer opens. The owner password
//! grants full permissions; the user password opens the document with
//! printing and copying allowed.

use crate::error::EncryptError;
use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

const KEY_LENGTH_BITS: usize = 128;

/// Result of [`protect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protected {
    pub bytes: Vec<u8>,
    /// Whether the returned bytes are encrypted.
    pub applied: bool,
}

/// Password-protect `pdf`.
///
/// * no passwords → input unchanged, `applied = false`
/// * owner credential = `owner_password`, else `user_password`
/// * opening credential = `user_password`, else empty (opens without prompt,
///   permissions still enforced)
pub fn protect(pdf: Vec<u8>, user_password: Option<&str>, owner_password: Option<&str>) -> Protected {
    let owner = match owner_password.or(user_password) {
        Some(owner) => owner,
        None => {
            return Protected {
                bytes: pdf,
                applied: false,
            }
        }
    };
    let user = user_password.unwrap_or("");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| encrypt_bytes(&pdf, user, owner)))
        .unwrap_or_else(|payload| Err(EncryptError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(bytes) => {
            debug!("PDF protected: {} → {} bytes", pdf.len(), bytes.len());
            Protected {
                bytes,
                applied: true,
            }
        }
        Err(e) => {
            warn!("PDF protection skipped: {}", e);
            Protected {
                bytes: pdf,
                applied: false,
            }
        }
    }
}

fn encrypt_bytes(pdf: &[u8], user: &str, owner: &str) -> Result<Vec<u8>, EncryptError> {
    let mut document = Document::load_mem(pdf).map_err(|e| EncryptError::Parse(e.to_string()))?;
    if document.is_encrypted() {
        return Err(EncryptError::AlreadyEncrypted);
    }
    ensure_file_id(&mut document);

    let permissions =
        Permissions::PRINTABLE | Permissions::PRINTABLE_IN_HIGH_QUALITY | Permissions::COPYABLE;
    let version = EncryptionVersion::V2 {
        document: &document,
        owner_password: owner,
        user_password: user,
        key_length: KEY_LENGTH_BITS,
        permissions,
    };
    let state =
        EncryptionState::try_from(version).map_err(|e| EncryptError::Encrypt(e.to_string()))?;
    document
        .encrypt(&state)
        .map_err(|e| EncryptError::Encrypt(e.to_string()))?;

    let mut out = Vec::with_capacity(pdf.len());
    document
        .save_to(&mut out)
        .map_err(|e| EncryptError::Write(e.to_string()))?;
    Ok(out)
}

/// Key derivation needs the trailer `/ID`; some producers omit it.
fn ensure_file_id(document: &mut Document) {
    if document.trailer.has(b"ID") {
        return;
    }
    let id = uuid::Uuid::new_v4().as_bytes().to_vec();
    document.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// A one-page "Hello" PDF built with lopdf.
    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    #[test]
    fn no_passwords_is_identity() {
        let input = b"anything at all".to_vec();
        let out = protect(input.clone(), None, None);
        assert_eq!(out.bytes, input);
        assert!(!out.applied);
    }

    #[test]
    fn garbage_input_returns_original() {
        let input = b"definitely not a pdf".to_vec();
        let out = protect(input.clone(), Some("user"), Some("owner"));
        assert!(!out.applied);
        assert_eq!(out.bytes, input);
    }

    #[test]
    fn empty_input_returns_original() {
        let out = protect(Vec::new(), Some("user"), None);
        assert!(!out.applied);
        assert!(out.bytes.is_empty());
    }

    #[test]
    fn encrypts_valid_pdf() {
        let input = sample_pdf();
        let out = protect(input.clone(), Some("open-sesame"), Some("owner"));
        assert!(out.applied);
        assert_ne!(out.bytes, input);
        assert!(out.bytes.starts_with(b"%PDF"));

        let reloaded = Document::load_mem(&out.bytes).unwrap();
        assert!(reloaded.is_encrypted());
    }

    #[test]
    fn owner_only_still_encrypts() {
        let out = protect(sample_pdf(), None, Some("owner"));
        assert!(out.applied);
    }

    #[test]
    fn already_encrypted_is_left_alone() {
        let once = protect(sample_pdf(), Some("a"), None);
        assert!(once.applied);
        let twice = protect(once.bytes.clone(), Some("b"), None);
        assert!(!twice.applied);
        assert_eq!(twice.bytes, once.bytes);
    }
}
