//! ArcGIS portal client over the REST sharing API.

use super::api::{is_draft_resource, AssetUploader, ContentApi, ItemProperties};
use crate::config::ConnectionProfile;
use crate::error::{Error, RemoteStep, Result};
use crate::model::{AssetRef, Resource};
use log::{debug, info, warn};
use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;

const TOKEN_MINUTES: u32 = 120;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const STORY_TYPE_KEYWORDS: &str = "JavaScript,StoryMap,Story Map,Web Story,Ready To Publish";

/// Blocking client for one portal account.
pub struct PortalClient {
    http: Client,
    portal_url: String,
    username: String,
    password: String,
    token: Option<String>,
}

impl PortalClient {
    /// Create a client from a connection profile. No request is made until
    /// the first call.
    pub fn new(profile: &ConnectionProfile) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("docx-storymap/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::remote(RemoteStep::Authenticate, e.to_string()))?;

        Ok(Self {
            http,
            portal_url: normalize_portal_url(&profile.url),
            username: profile.username.clone(),
            password: profile.password.clone(),
            token: None,
        })
    }

    /// Base portal URL, without a trailing slash.
    pub fn portal_url(&self) -> &str {
        &self.portal_url
    }

    /// Viewer URL of a story item.
    pub fn story_url(&self, item_id: &str) -> String {
        story_url(&self.portal_url, item_id)
    }

    /// Builder URL of a story item.
    pub fn story_edit_url(&self, item_id: &str) -> String {
        format!("{}/edit", self.story_url(item_id))
    }

    /// Exchange credentials for a token.
    pub fn authenticate(&mut self) -> Result<()> {
        let step = RemoteStep::Authenticate;
        let url = format!("{}/generateToken", self.rest_url());
        let form = [
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("referer", self.portal_url.clone()),
            ("expiration", TOKEN_MINUTES.to_string()),
            ("f", "json".to_string()),
        ];
        let body = send(step, self.http.post(url).form(&form))?;
        let token = body["token"]
            .as_str()
            .ok_or_else(|| Error::remote(step, "response carries no token"))?;
        info!("Signed in to {} as {}", self.portal_url, self.username);
        self.token = Some(token.to_string());
        Ok(())
    }

    fn token(&mut self) -> Result<String> {
        if self.token.is_none() {
            self.authenticate()?;
        }
        self.token
            .clone()
            .ok_or_else(|| Error::remote(RemoteStep::Authenticate, "no token"))
    }

    fn rest_url(&self) -> String {
        format!("{}/sharing/rest", self.portal_url)
    }

    fn user_content_url(&self) -> String {
        format!("{}/content/users/{}", self.rest_url(), self.username)
    }

    fn item_resources_url(&self, item_id: &str) -> String {
        format!("{}/content/items/{}/resources", self.rest_url(), item_id)
    }

    /// Name of the builder draft resource of an item, if it has one.
    fn draft_resource(&mut self, step: RemoteStep, item_id: &str) -> Result<Option<String>> {
        let token = self.token()?;
        let body = send(
            step,
            self.http
                .get(self.item_resources_url(item_id))
                .query(&[("f", "json"), ("num", "100"), ("token", token.as_str())]),
        )?;
        Ok(draft_resource_name(&body))
    }

    fn read_draft(&mut self, item_id: &str, name: &str) -> Result<Value> {
        let step = RemoteStep::GetItemJson;
        let token = self.token()?;
        let url = format!("{}/{}", self.item_resources_url(item_id), name);
        let tree = send(step, self.http.get(url).query(&[("token", token.as_str())]))?;
        if tree.get("nodes").is_none() {
            return Err(Error::remote(step, format!("{} holds no story tree", name)));
        }
        Ok(tree)
    }

    fn write_draft(&mut self, item_id: &str, name: &str, text: String) -> Result<()> {
        let step = RemoteStep::UpdateItemJson;
        let token = self.token()?;
        let part = multipart::Part::text(text)
            .file_name(name.to_string())
            .mime_str("application/json")
            .map_err(|e| Error::remote(step, e.to_string()))?;
        let form = multipart::Form::new()
            .text("f", "json")
            .text("token", token)
            .text("fileName", name.to_string())
            .text("access", "inherit")
            .part("file", part);
        let url = format!("{}/items/{}/updateResources", self.user_content_url(), item_id);
        let body = send(step, self.http.post(url).multipart(form))?;
        if body["success"].as_bool() == Some(false) {
            return Err(Error::remote(step, format!("portal refused {}", name)));
        }
        debug!("Wrote draft resource {} of item {}", name, item_id);
        Ok(())
    }
}

impl AssetUploader for PortalClient {
    fn upload_asset(&mut self, resource: &Resource, name: &str) -> Result<AssetRef> {
        let step = RemoteStep::UploadAsset;
        let token = self.token()?;
        let part = multipart::Part::bytes(resource.data.clone())
            .file_name(name.to_string())
            .mime_str(&resource.mime_type)
            .map_err(|e| Error::remote(step, e.to_string()))?;
        let form = multipart::Form::new()
            .text("f", "json")
            .text("token", token)
            .text("type", "Image")
            .text("title", name.to_string())
            .part("file", part);

        let url = format!("{}/addItem", self.user_content_url());
        let body = send(step, self.http.post(url).multipart(form))?;
        let id = item_id(step, &body)?;
        debug!("Uploaded {} as item {}", name, id);
        Ok(AssetRef::Uri {
            src: format!("{}/content/items/{}/data", self.rest_url(), id),
        })
    }
}

impl ContentApi for PortalClient {
    fn create_item(&mut self, draft: &Value, properties: &ItemProperties) -> Result<String> {
        let step = RemoteStep::CreateItem;
        let token = self.token()?;
        let text = serde_json::to_string(draft).map_err(|e| Error::remote(step, e.to_string()))?;
        let mut form = vec![
            ("f", "json".to_string()),
            ("token", token),
            ("type", "StoryMap".to_string()),
            ("typeKeywords", STORY_TYPE_KEYWORDS.to_string()),
            ("title", properties.title.clone()),
            ("tags", properties.tags_field()),
            ("text", text),
        ];
        if let Some(summary) = &properties.summary {
            form.push(("snippet", summary.clone()));
        }
        if let Some(description) = &properties.description {
            form.push(("description", description.clone()));
        }

        let url = format!("{}/addItem", self.user_content_url());
        let body = send(step, self.http.post(url).form(&form))?;
        item_id(step, &body)
    }

    fn get_item_json(&mut self, item_id: &str) -> Result<Value> {
        let step = RemoteStep::GetItemJson;
        if let Some(name) = self.draft_resource(step, item_id)? {
            match self.read_draft(item_id, &name) {
                Ok(tree) => {
                    debug!("Read item {} from draft resource {}", item_id, name);
                    return Ok(tree);
                }
                Err(e) => warn!("{}; reading item data instead", e),
            }
        }

        let token = self.token()?;
        let url = format!("{}/content/items/{}/data", self.rest_url(), item_id);
        send(
            step,
            self.http.get(url).query(&[("f", "json"), ("token", token.as_str())]),
        )
    }

    fn update_item_json(&mut self, item_id: &str, tree: &Value) -> Result<()> {
        let step = RemoteStep::UpdateItemJson;
        let token = self.token()?;
        let text = serde_json::to_string(tree).map_err(|e| Error::remote(step, e.to_string()))?;
        let form = [
            ("f", "json".to_string()),
            ("token", token),
            ("text", text.clone()),
        ];
        let url = format!("{}/items/{}/update", self.user_content_url(), item_id);
        let body = send(step, self.http.post(url).form(&form))?;
        if body["success"].as_bool() == Some(false) {
            return Err(Error::remote(step, "portal reported failure"));
        }

        match self.draft_resource(step, item_id)? {
            Some(name) => self.write_draft(item_id, &name, text),
            None => {
                debug!("Item {} has no draft resource; only item data updated", item_id);
                Ok(())
            }
        }
    }
}

/// Send a request and read a JSON body, turning transport errors, HTTP
/// errors and `{"error": ...}` bodies into remote-call errors.
fn send(step: RemoteStep, request: RequestBuilder) -> Result<Value> {
    let response = request
        .send()
        .map_err(|e| Error::remote(step, e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::remote(step, format!("HTTP {}", status)));
    }
    let body: Value = response
        .json()
        .map_err(|e| Error::remote(step, format!("invalid JSON response: {}", e)))?;
    match error_message(&body) {
        Some(message) => Err(Error::remote(step, message)),
        None => Ok(body),
    }
}

/// Message of a portal error body, if the body is one.
fn error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    let mut message = error["message"]
        .as_str()
        .unwrap_or("unknown portal error")
        .to_string();
    if let Some(code) = error["code"].as_i64() {
        message = format!("{} (code {})", message, code);
    }
    let details: Vec<&str> = error["details"]
        .as_array()
        .map(|d| d.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if !details.is_empty() {
        message = format!("{}: {}", message, details.join("; "));
    }
    Some(message)
}

/// First draft resource listed in an item resources response.
fn draft_resource_name(body: &Value) -> Option<String> {
    body["resources"]
        .as_array()?
        .iter()
        .filter_map(|r| r["resource"].as_str())
        .find(|name| is_draft_resource(name))
        .map(String::from)
}

fn item_id(step: RemoteStep, body: &Value) -> Result<String> {
    body["id"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| Error::remote(step, "response carries no item id"))
}

/// Portal base URL: scheme added, trailing slash and REST suffixes removed.
pub fn normalize_portal_url(url: &str) -> String {
    let mut url = url.trim().trim_end_matches('/').to_string();
    if !url.contains("://") {
        url = format!("https://{}", url);
    }
    for suffix in ["/sharing/rest", "/home"] {
        if let Some(stripped) = url.strip_suffix(suffix) {
            url = stripped.to_string();
        }
    }
    url
}

/// Viewer URL of a story on a given portal.
pub fn story_url(portal_url: &str, item_id: &str) -> String {
    let portal_url = normalize_portal_url(portal_url);
    if portal_url.contains("arcgis.com") {
        format!("https://storymaps.arcgis.com/stories/{}", item_id)
    } else {
        format!("{}/apps/storymaps/stories/{}", portal_url, item_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_portal_url() {
        assert_eq!(normalize_portal_url("www.arcgis.com/"), "https://www.arcgis.com");
        assert_eq!(
            normalize_portal_url("https://gis.example.org/portal/sharing/rest"),
            "https://gis.example.org/portal"
        );
        assert_eq!(
            normalize_portal_url("https://gis.example.org/portal/home/"),
            "https://gis.example.org/portal"
        );
    }

    #[test]
    fn test_story_urls() {
        assert_eq!(
            story_url("https://www.arcgis.com", "abc123"),
            "https://storymaps.arcgis.com/stories/abc123"
        );
        assert_eq!(
            story_url("https://gis.example.org/portal", "abc123"),
            "https://gis.example.org/portal/apps/storymaps/stories/abc123"
        );
    }

    #[test]
    fn test_error_message() {
        let body = json!({
            "error": { "code": 498, "message": "Invalid token.", "details": ["expired"] }
        });
        assert_eq!(
            error_message(&body).as_deref(),
            Some("Invalid token. (code 498): expired")
        );
        assert!(error_message(&json!({ "success": true, "id": "x" })).is_none());
    }

    #[test]
    fn test_draft_resource_name() {
        let body = json!({
            "total": 3,
            "resources": [
                { "resource": "images/cover.png" },
                { "resource": "draft_1712345678.json", "access": "inherit" },
                { "resource": "draft_older.json" }
            ]
        });
        assert_eq!(draft_resource_name(&body).as_deref(), Some("draft_1712345678.json"));
        assert_eq!(draft_resource_name(&json!({ "total": 0, "resources": [] })), None);
        assert_eq!(draft_resource_name(&json!({})), None);
    }

    #[test]
    fn test_client_urls() {
        let profile = ConnectionProfile::new("gis.example.org/portal", "ana", "secret");
        let client = PortalClient::new(&profile).unwrap();
        assert_eq!(client.portal_url(), "https://gis.example.org/portal");
        assert_eq!(
            client.user_content_url(),
            "https://gis.example.org/portal/sharing/rest/content/users/ana"
        );
        assert_eq!(
            client.item_resources_url("42"),
            "https://gis.example.org/portal/sharing/rest/content/items/42/resources"
        );
        assert_eq!(
            client.story_edit_url("42"),
            "https://gis.example.org/portal/apps/storymaps/stories/42/edit"
        );
    }
}
