use deploy_auth::{AuthEnvelope, upload_path};
use http::{Method, header};
use reqwest::Url;

use crate::error::ClientError;

/// One file destined for `<path_key>/<file_name>` on the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub path_key: String,
    /// Relative name under the path key, `/`-separated.
    pub file_name: String,
    pub payload: Vec<u8>,
    /// Ask the receiver to unpack the archive after storing it.
    pub extract: bool,
}

impl UploadRequest {
    pub fn new(
        path_key: impl Into<String>,
        file_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            path_key: path_key.into(),
            file_name: file_name.into(),
            payload,
            extract: false,
        }
    }

    pub fn with_extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }

    /// The path that gets signed, without query string.
    pub fn url_path(&self) -> String {
        upload_path(&self.path_key, &self.file_name)
    }
}

/// Parses a server base URL such as `http://deploy.internal:8022`.
pub fn parse_server_url(server: &str) -> Result<Url, ClientError> {
    let url = Url::parse(server).map_err(|e| ClientError::InvalidServerUrl {
        url: server.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidServerUrl {
            url: server.to_string(),
            reason: "expected an http or https URL".to_string(),
        });
    }
    Ok(url)
}

/// Appends `segments` to the base URL path, percent-encoding each one.
pub fn endpoint_url<'a>(
    base_url: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, ClientError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidServerUrl {
            url: base_url.to_string(),
            reason: "URL cannot carry a path".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

pub fn upload_url(base_url: &Url, upload: &UploadRequest) -> Result<Url, ClientError> {
    let mut url = endpoint_url(
        base_url,
        ["upload", upload.path_key.as_str()]
            .into_iter()
            .chain(upload.file_name.split('/')),
    )?;
    if upload.extract {
        url.set_query(Some("extract=true"));
    }
    Ok(url)
}

/// Builds the outbound POST for `upload`, carrying `envelope` in its headers.
///
/// Pure: performs no I/O. The `extract` query parameter is outside the signed
/// message.
pub fn compose_request(
    base_url: &Url,
    upload: UploadRequest,
    envelope: &AuthEnvelope,
) -> Result<http::Request<Vec<u8>>, ClientError> {
    debug_assert_eq!(envelope.url_path, upload.url_path());

    let url = upload_url(base_url, &upload)?;
    let mut request = http::Request::builder()
        .method(Method::POST)
        .uri(url.as_str())
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(upload.payload)
        .map_err(|e| ClientError::InvalidServerUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    envelope.write_headers(request.headers_mut())?;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_auth::{Ed25519Signer, Nonce};

    fn envelope_for(upload: &UploadRequest) -> AuthEnvelope {
        let signer = Ed25519Signer::from_seed(&[1u8; 32]);
        AuthEnvelope::sign(&signer, 1_700_000_000, Nonce::from_bytes([0xab; 16]), upload.url_path())
    }

    #[test]
    fn composes_signed_post() {
        let base = parse_server_url("http://deploy.internal:8022").unwrap();
        let upload = UploadRequest::new("web", "a.txt", b"0123456789".to_vec());
        let envelope = envelope_for(&upload);

        let request = compose_request(&base, upload, &envelope).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), "http://deploy.internal:8022/upload/web/a.txt");
        assert_eq!(request.headers()["x-timestamp"], "1700000000");
        assert_eq!(request.headers()["x-nonce"], "abababababababababababababababab");
        assert_eq!(request.headers()["x-signature"], envelope.signature_hex().as_str());
        assert_eq!(request.headers()[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(request.body(), b"0123456789");
    }

    #[test]
    fn extract_goes_into_the_query_only() {
        let base = parse_server_url("http://deploy.internal:8022/").unwrap();
        let upload = UploadRequest::new("web", "site.zip", Vec::new()).with_extract(true);
        let envelope = envelope_for(&upload);
        assert_eq!(envelope.url_path, "/upload/web/site.zip");

        let request = compose_request(&base, upload, &envelope).unwrap();
        assert_eq!(
            request.uri(),
            "http://deploy.internal:8022/upload/web/site.zip?extract=true"
        );
    }

    #[test]
    fn nested_names_keep_their_slashes() {
        let base = parse_server_url("http://localhost:8022").unwrap();
        let upload = UploadRequest::new("web", "assets/js/app file.js", Vec::new());
        let url = upload_url(&base, &upload).unwrap();
        assert_eq!(url.path(), "/upload/web/assets/js/app%20file.js");
    }

    #[test]
    fn rejects_non_http_servers() {
        assert!(matches!(
            parse_server_url("ftp://example.com"),
            Err(ClientError::InvalidServerUrl { .. })
        ));
        assert!(parse_server_url("not a url").is_err());
    }
}
