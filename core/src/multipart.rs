//! Single-file `multipart/form-data` bodies for uploads.
//!
//! Encoding (boundary, part headers, MIME guessing from the file
//! extension) belongs to the `multipart` crate; this module only buffers
//! the prepared form so it can be replayed across redirect hops.

use std::io::Read;
use std::path::Path;

use multipart::client::lazy::Multipart;

use crate::error::Result;

/// An encoded multipart body holding one file part.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartForm {
    /// Read `path` in full and wrap it as the form field `field`.
    pub fn from_file(path: impl AsRef<Path>, field: &str) -> Result<Self> {
        let mut form = Multipart::new();
        form.add_file(field.to_string(), path.as_ref().to_path_buf());

        let mut prepared = form.prepare().map_err(|e| e.error)?;
        let boundary = prepared.boundary().to_string();
        let mut body = Vec::new();
        prepared.read_to_end(&mut body)?;

        Ok(Self { boundary, body })
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use std::io::Write;

    #[test]
    fn reads_file_from_disk_and_uses_its_base_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payload").unwrap();
        let name = file.path().file_name().unwrap().to_string_lossy().into_owned();

        let form = MultipartForm::from_file(file.path(), "upload").unwrap();
        let boundary = form.boundary().to_string();
        assert!(!boundary.is_empty());
        assert_eq!(
            form.content_type(),
            format!("multipart/form-data; boundary={boundary}")
        );

        let body = String::from_utf8(form.into_body()).unwrap();
        assert!(body.contains(&format!("--{boundary}")));
        assert!(body.contains("name=\"upload\""));
        assert!(body.contains(&format!("filename=\"{name}\"")));
        assert!(body.contains("payload"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = MultipartForm::from_file("/definitely/not/here.bin", "f").unwrap_err();
        assert!(matches!(err, RequestError::Io(_)));
    }
}
