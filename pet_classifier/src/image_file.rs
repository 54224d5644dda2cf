use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

/// A file picked or dropped by the user, as received from the browser.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
    /// Bytes received from the browser. Equals `data.len()` unless the body
    /// was discarded for exceeding the upload limit.
    size: u64,
}

impl ImageFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            data,
        }
    }

    /// A file whose body was not kept, only its received size.
    pub fn discarded(name: impl Into<String>, content_type: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: Bytes::new(),
            size,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// `data:<mime>;base64,<payload>`, usable both as an `<img src>` and as
    /// the body of a base64 prediction request.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.data)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_url() {
        let file = ImageFile::new("tiny.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        assert_eq!(file.to_data_url(), "data:image/png;base64,iVBORw==");
        assert_eq!(file.size(), 4);
    }

    #[test]
    fn test_discarded_keeps_received_size() {
        let file = ImageFile::discarded("huge.png", "image/png", 25 * 1024 * 1024);
        assert_eq!(file.size(), 25 * 1024 * 1024);
        assert!(file.data.is_empty());
    }

    #[test]
    fn test_is_image() {
        assert!(ImageFile::new("a.jpg", "image/jpeg", Bytes::new()).is_image());
        assert!(ImageFile::new("a.gif", "image/gif", Bytes::new()).is_image());
        assert!(!ImageFile::new("a.txt", "text/plain", Bytes::new()).is_image());
        assert!(!ImageFile::new("a.jpg", "", Bytes::new()).is_image());
    }
}
