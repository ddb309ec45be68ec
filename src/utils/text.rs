use std::io::Cursor;

use lopdf::Document;

/// Shortest extracted text still considered usable resume content.
pub const MIN_RESUME_TEXT_CHARS: usize = 100;

/// Text of an uploaded PDF resume, control bytes blanked and whitespace
/// collapsed. Documents lopdf cannot parse are read as lossy UTF-8 instead.
/// Falls back to a note naming the file when the result is too short to be
/// real text (scanned images, empty pages).
pub fn extract_pdf_text(file_name: &str, bytes: &[u8]) -> String {
    let text = match pdf_document_text(bytes) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(file_name, error = %e, "resume is not a readable PDF document, using raw bytes");
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    let cleaned: String = text
        .chars()
        .map(|c| if is_junk_control(c) { ' ' } else { c })
        .collect();
    let collapsed = collapse_whitespace(&cleaned);

    if collapsed.chars().count() < MIN_RESUME_TEXT_CHARS {
        return format!(
            "[PDF Resume uploaded: {}, Size: {} bytes. Unable to extract text - please ensure the PDF contains searchable text, not just images.]",
            file_name,
            bytes.len()
        );
    }
    collapsed
}

fn pdf_document_text(bytes: &[u8]) -> Result<String, lopdf::Error> {
    let doc = Document::load_from(Cursor::new(bytes))?;

    let mut text = String::new();
    for page_num in doc.get_pages().keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push(' ');
            }
            Err(e) => {
                tracing::warn!(page = *page_num, error = %e, "failed to extract text from PDF page");
            }
        }
    }
    Ok(text)
}

// Tab, LF and CR survive so they collapse as ordinary whitespace.
fn is_junk_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'..='\u{9F}')
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Log-safe form of an email address.
pub fn redact_email(email: &str) -> String {
    let prefix: String = email.chars().take(3).collect();
    format!("{}***", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Single-page PDF whose content stream is Flate-compressed.
    fn compressed_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 11.into()]),
            Operation::new("Td", vec![50.into(), 780.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-14).into()]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn compressed_pdf_content_is_extracted() {
        let skills = "Rust Tokio Postgres Kubernetes distributed systems";
        let bytes = compressed_pdf(&[
            "Ada Lovelace - Senior Rust Engineer",
            skills,
            skills,
            skills,
            "Led a team of five engineers",
        ]);
        assert!(
            !bytes.windows(8).any(|w| w == b"Lovelace"),
            "content stream should be compressed"
        );

        let text = extract_pdf_text("resume.pdf", &bytes);
        assert!(text.contains("Ada Lovelace"), "{}", text);
        assert!(text.contains("Led a team of five engineers"));
        assert!(!text.contains("%PDF"));
        assert!(!text.contains("FlateDecode"));
        assert!(!text.contains("  "));
    }

    #[test]
    fn image_only_pdf_becomes_placeholder() {
        let bytes = compressed_pdf(&[]);
        let text = extract_pdf_text("scan.pdf", &bytes);
        assert!(text.starts_with("[PDF Resume uploaded: scan.pdf, Size: "), "{}", text);
    }

    #[test]
    fn unparseable_pdf_falls_back_to_raw_bytes() {
        let mut bytes = b"%PDF-1.4\x00\x01 Jane   Doe\n\nSenior Engineer ".to_vec();
        bytes.extend("Rust Go Kubernetes ".repeat(10).as_bytes());
        let text = extract_pdf_text("cv.pdf", &bytes);
        assert!(text.starts_with("%PDF-1.4 Jane Doe Senior Engineer Rust Go"));
        assert!(!text.contains('\u{0}'));
        assert!(!text.contains("  "));
    }

    #[test]
    fn sparse_pdf_text_becomes_placeholder() {
        let bytes = [0u8, 1, 2, 3, b'h', b'i', 0x1F];
        let text = extract_pdf_text("scan.pdf", &bytes);
        assert_eq!(
            text,
            "[PDF Resume uploaded: scan.pdf, Size: 7 bytes. Unable to extract text - please ensure the PDF contains searchable text, not just images.]"
        );
    }

    #[test]
    fn email_redaction_keeps_three_chars() {
        assert_eq!(redact_email("alice@example.com"), "ali***");
        assert_eq!(redact_email("a@"), "a@***");
    }
}
