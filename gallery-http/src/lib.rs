use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use gallery_core::config::ServerConfig;
use gallery_core::error::{GalleryError, Result};
use gallery_core::models::{Actor, Image, ImageId, ImageUpdate, MutationAck, NewImage};
use gallery_core::service::{ImageService, SessionService};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Client for the gallery web server. The session lives in the client's cookie
/// jar, so one instance serves both the image and session contracts.
pub struct HttpGallery {
    client: reqwest::Client,
    base: Url,
}

impl HttpGallery {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        // An expired session comes back as a redirect to the login page.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            base: config.base(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Actor> {
        let url = self.endpoint("login")?;
        debug!(%url, username, "logging in");
        let resp = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        if !resp.status().is_redirection() {
            return Err(GalleryError::rejected(
                StatusCode::UNAUTHORIZED.as_u16(),
                "Invalid username or password",
            ));
        }
        self.current_actor()
            .await?
            .ok_or(GalleryError::Unauthenticated)
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<()> {
        validate_registration(username, password)?;
        let url = self.endpoint("register")?;
        debug!(%url, username, "registering");
        let resp = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        if resp.status().is_redirection() {
            Ok(())
        } else {
            Err(GalleryError::rejected(
                StatusCode::CONFLICT.as_u16(),
                "Username already exists",
            ))
        }
    }

    pub async fn logout(&self) -> Result<()> {
        self.client.get(self.endpoint("logout")?).send().await?;
        Ok(())
    }
}

pub fn validate_registration(username: &str, password: &str) -> Result<()> {
    if username.chars().count() < MIN_USERNAME_LEN || password.chars().count() < MIN_PASSWORD_LEN {
        return Err(GalleryError::rejected(
            StatusCode::BAD_REQUEST.as_u16(),
            "Username must be at least 3 characters and password at least 6 characters",
        ));
    }
    Ok(())
}

#[async_trait]
impl ImageService for HttpGallery {
    async fn list_images(&self) -> Result<Vec<Image>> {
        let resp = self.client.get(self.endpoint("api/images")?).send().await?;
        let images: Vec<Image> = read_json(resp).await?;
        debug!(count = images.len(), "fetched images");
        Ok(images)
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let resp = self.client.get(self.endpoint("api/tags")?).send().await?;
        let tags: Vec<String> = read_json(resp).await?;
        Ok(clean_tags(tags))
    }

    async fn create_image(&self, upload: NewImage) -> Result<MutationAck> {
        let file = Part::bytes(upload.content.to_vec()).file_name(upload.file_name);
        let form = Form::new()
            .part("file", file)
            .text("title", upload.title)
            .text("description", upload.description)
            .text("tags", upload.tags);
        let resp = self
            .client
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await?;
        read_ack(resp).await
    }

    async fn update_image(&self, id: ImageId, update: &ImageUpdate) -> Result<MutationAck> {
        let resp = self
            .client
            .put(self.endpoint(&format!("api/images/{id}"))?)
            .json(update)
            .send()
            .await?;
        read_ack(resp).await
    }

    async fn delete_image(&self, id: ImageId) -> Result<MutationAck> {
        let resp = self
            .client
            .delete(self.endpoint(&format!("api/images/{id}"))?)
            .send()
            .await?;
        read_ack(resp).await
    }
}

#[async_trait]
impl SessionService for HttpGallery {
    async fn current_actor(&self) -> Result<Option<Actor>> {
        let resp = self.client.get(self.endpoint("api/user")?).send().await?;
        match read_json(resp).await {
            Ok(actor) => Ok(Some(actor)),
            Err(GalleryError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// -- API response types --

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

#[derive(Debug, Deserialize)]
struct AckBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = check_session(resp.status())?;
    let body = resp.bytes().await?;
    if !status.is_success() {
        return Err(rejection(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

async fn read_ack(resp: Response) -> Result<MutationAck> {
    let status = check_session(resp.status())?;
    let body = resp.bytes().await?;
    if !status.is_success() {
        return Err(rejection(status, &body));
    }
    ack_from_body(status, &body)
}

fn check_session(status: StatusCode) -> Result<StatusCode> {
    if status.is_redirection() || status == StatusCode::UNAUTHORIZED {
        return Err(GalleryError::Unauthenticated);
    }
    Ok(status)
}

fn rejection(status: StatusCode, body: &[u8]) -> GalleryError {
    let body: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    debug!(%status, error = %body.error, "server rejected request");
    GalleryError::rejected(status.as_u16(), body.error)
}

fn ack_from_body(status: StatusCode, body: &[u8]) -> Result<MutationAck> {
    let ack: AckBody = serde_json::from_slice(body)?;
    match ack {
        AckBody {
            success: false,
            error: Some(error),
            ..
        } => Err(GalleryError::rejected(status.as_u16(), error)),
        AckBody { message, .. } => Ok(MutationAck { message }),
    }
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gallery_core::models::UserId;

    const MOCK_IMAGES: &str = r#"[
        {
            "id": 7,
            "filename": "20240501_182210_sunset.png",
            "title": "Sunset",
            "description": "Over the bay",
            "tags": ["nature", "orange"],
            "uploaded_by": 1,
            "created_at": "2024-05-01 18:22:10"
        },
        {
            "id": 3,
            "filename": "city.jpg",
            "title": "City",
            "description": null,
            "tags": [],
            "uploaded_by": 2,
            "created_at": "2024-04-11 09:00:00"
        }
    ]"#;

    #[test]
    fn test_parse_images_response() {
        let images: Vec<Image> = serde_json::from_str(MOCK_IMAGES).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].id, ImageId::new(7));
        assert_eq!(images[0].tags, vec!["nature", "orange"]);
        assert_eq!(images[0].uploaded_by, Some(UserId::new(1)));
        assert_eq!(images[1].description, None);
    }

    #[test]
    fn test_parse_user_response() {
        let actor: Actor = serde_json::from_str(r#"{"id": 1, "username": "alice"}"#).unwrap();
        assert_eq!(actor.id, UserId::new(1));
        assert_eq!(actor.username, "alice");
    }

    #[test]
    fn test_ack_success() {
        let ack = ack_from_body(
            StatusCode::OK,
            br#"{"success": true, "message": "Image deleted successfully"}"#,
        )
        .unwrap();
        assert_eq!(ack.message.as_deref(), Some("Image deleted successfully"));
    }

    #[test]
    fn test_ack_with_error_is_rejection() {
        let err = ack_from_body(StatusCode::OK, br#"{"error": "Title is required"}"#).unwrap_err();
        assert_eq!(err.notice_text("Update failed"), "Title is required");
    }

    #[test]
    fn test_rejection_uses_error_field() {
        let err = rejection(StatusCode::FORBIDDEN, br#"{"error": "Unauthorized"}"#);
        assert!(matches!(
            err,
            GalleryError::Rejected { status: 403, ref message } if message == "Unauthorized"
        ));
    }

    #[test]
    fn test_rejection_without_body_falls_back() {
        let err = rejection(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>");
        assert_eq!(err.notice_text("Delete failed"), "Delete failed");
    }

    #[test]
    fn test_redirect_means_logged_out() {
        assert!(matches!(
            check_session(StatusCode::FOUND),
            Err(GalleryError::Unauthenticated)
        ));
        assert!(check_session(StatusCode::BAD_REQUEST).is_ok());
    }

    #[test]
    fn test_clean_tags_drops_blanks() {
        let tags = clean_tags(vec!["".into(), " nature ".into(), "urban".into()]);
        assert_eq!(tags, vec!["nature", "urban"]);
    }

    #[test]
    fn test_validate_registration() {
        assert!(validate_registration("bob", "secret").is_ok());
        assert!(validate_registration("bo", "secret").is_err());
        assert!(validate_registration("bob", "short").is_err());
    }

    #[test]
    fn test_endpoints_join_under_base_path() {
        let config = ServerConfig {
            base_url: Url::parse("http://example.com/gallery").unwrap(),
            ..ServerConfig::default()
        };
        let client = HttpGallery::new(&config).unwrap();
        assert_eq!(
            client.endpoint("api/images/4").unwrap().as_str(),
            "http://example.com/gallery/api/images/4"
        );
        assert_eq!(client.base().as_str(), "http://example.com/gallery/");
    }

    // -- loopback server --

    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Debug, Clone)]
    struct Captured {
        head: String,
        body: Vec<u8>,
    }

    impl Captured {
        fn request_line(&self) -> &str {
            self.head.lines().next().unwrap_or_default()
        }

        fn header_text(&self) -> String {
            self.head.to_ascii_lowercase()
        }

        fn body_text(&self) -> String {
            String::from_utf8_lossy(&self.body).into_owned()
        }
    }

    /// Answers one request per connection with whatever `route` returns for its
    /// request line, and keeps every request it saw.
    struct StubServer {
        base: Url,
        captured: Arc<Mutex<Vec<Captured>>>,
    }

    impl StubServer {
        async fn start(route: fn(&str) -> String) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let captured = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&captured);
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let Some(request) = read_request(&mut stream).await else {
                        continue;
                    };
                    let response = route(request.request_line());
                    log.lock().unwrap().push(request);
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });
            Self {
                base: Url::parse(&format!("http://{addr}/")).unwrap(),
                captured,
            }
        }

        fn client(&self) -> HttpGallery {
            HttpGallery::new(&ServerConfig {
                base_url: self.base.clone(),
                ..ServerConfig::default()
            })
            .unwrap()
        }

        fn requests(&self) -> Vec<Captured> {
            self.captured.lock().unwrap().clone()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> Option<Captured> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            if let Some(request) = parse_request(&buf) {
                return Some(request);
            }
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn parse_request(buf: &[u8]) -> Option<Captured> {
        let end = buf.windows(4).position(|w| w == b"\r\n\r\n")?;
        let head = String::from_utf8_lossy(&buf[..end]).into_owned();
        let rest = &buf[end + 4..];
        let length = head.lines().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        });
        let chunked = head
            .to_ascii_lowercase()
            .contains("transfer-encoding: chunked");
        match length {
            Some(len) if rest.len() >= len => Some(Captured {
                head,
                body: rest[..len].to_vec(),
            }),
            Some(_) => None,
            None if chunked => rest.ends_with(b"0\r\n\r\n").then(|| Captured {
                head,
                body: rest.to_vec(),
            }),
            None => Some(Captured {
                head,
                body: Vec::new(),
            }),
        }
    }

    fn respond(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn redirect(location: &str) -> String {
        format!("HTTP/1.1 302 FOUND\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
    }

    const LOGIN_PAGE: &str = "<html><body><form action=\"/login\"></form></body></html>";
    const ACK_OK: &str = r#"{"success": true, "message": "Image updated successfully"}"#;

    #[tokio::test]
    async fn test_current_actor_redirect_is_anonymous() {
        let server = StubServer::start(|_| redirect("/login")).await;
        let client = server.client();

        assert_eq!(client.current_actor().await.unwrap(), None);
        assert!(matches!(
            client.list_images().await,
            Err(GalleryError::Unauthenticated)
        ));

        let requests = server.requests();
        assert!(requests[0].request_line().starts_with("GET /api/user "));
        assert!(requests[1].request_line().starts_with("GET /api/images "));
    }

    #[tokio::test]
    async fn test_login_page_answer_is_invalid_credentials() {
        let server = StubServer::start(|_| respond("200 OK", "text/html", LOGIN_PAGE)).await;
        let err = server.client().login("alice", "secret1").await.unwrap_err();

        assert_eq!(err.notice_text(""), "Invalid username or password");
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].request_line().starts_with("POST /login "));
        assert_eq!(requests[0].body_text(), "username=alice&password=secret1");
    }

    #[tokio::test]
    async fn test_login_redirect_keeps_session_cookie() {
        let server = StubServer::start(|line| {
            if line.starts_with("POST /login ") {
                "HTTP/1.1 302 FOUND\r\nLocation: /\r\nSet-Cookie: session=abc123; Path=/\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
            } else {
                respond("200 OK", "application/json", r#"{"id": 1, "username": "alice"}"#)
            }
        })
        .await;

        let actor = server.client().login("alice", "secret1").await.unwrap();
        assert_eq!(actor.username, "alice");

        let requests = server.requests();
        assert!(requests[1].request_line().starts_with("GET /api/user "));
        assert!(requests[1].header_text().contains("cookie: session=abc123"));
    }

    #[tokio::test]
    async fn test_register_failure_is_rejected() {
        let server = StubServer::start(|_| respond("200 OK", "text/html", "<html></html>")).await;
        let client = server.client();

        let err = client.register("alice", "secret1").await.unwrap_err();
        assert!(matches!(
            err,
            GalleryError::Rejected { status: 409, ref message } if message == "Username already exists"
        ));

        // too short: refused before anything is sent
        assert!(client.register("al", "secret1").await.is_err());
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_forbidden_carries_server_message() {
        let server = StubServer::start(|_| {
            respond("403 FORBIDDEN", "application/json", r#"{"error": "Unauthorized"}"#)
        })
        .await;

        let err = server.client().delete_image(ImageId::new(2)).await.unwrap_err();
        assert!(matches!(
            err,
            GalleryError::Rejected { status: 403, ref message } if message == "Unauthorized"
        ));
        assert!(server.requests()[0]
            .request_line()
            .starts_with("DELETE /api/images/2 "));
    }

    #[tokio::test]
    async fn test_update_sends_tags_as_one_string() {
        let server = StubServer::start(|_| respond("200 OK", "application/json", ACK_OK)).await;
        let update = ImageUpdate {
            title: "Dunes".into(),
            description: String::new(),
            tags: "sand, sky".into(),
        };

        let ack = server
            .client()
            .update_image(ImageId::new(4), &update)
            .await
            .unwrap();
        assert_eq!(ack.message.as_deref(), Some("Image updated successfully"));

        let request = &server.requests()[0];
        assert!(request.request_line().starts_with("PUT /api/images/4 "));
        assert!(request.header_text().contains("content-type: application/json"));
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["title"], "Dunes");
        assert_eq!(body["tags"], "sand, sky");
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_fields() {
        let server = StubServer::start(|_| {
            respond(
                "200 OK",
                "application/json",
                r#"{"success": true, "message": "Image uploaded successfully"}"#,
            )
        })
        .await;
        let upload = NewImage {
            file_name: "sunset.png".into(),
            content: b"PNGDATA".to_vec().into(),
            title: "Sunset".into(),
            description: "Over the bay".into(),
            tags: "nature, orange".into(),
        };

        let ack = server.client().create_image(upload).await.unwrap();
        assert_eq!(ack.message.as_deref(), Some("Image uploaded successfully"));

        let request = &server.requests()[0];
        assert!(request.request_line().starts_with("POST /upload "));
        assert!(request
            .header_text()
            .contains("content-type: multipart/form-data; boundary="));
        let body = request.body_text();
        for field in [
            r#"name="file"; filename="sunset.png""#,
            r#"name="title""#,
            r#"name="description""#,
            r#"name="tags""#,
        ] {
            assert!(body.contains(field), "missing {field} in {body}");
        }
        assert!(body.contains("PNGDATA"));
        assert!(body.contains("Over the bay"));
        assert!(body.contains("nature, orange"));
    }
}
