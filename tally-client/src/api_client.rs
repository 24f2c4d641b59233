use crate::settings::Credentials;
use eyre::{bail, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Request, Response, StatusCode, Url};
use serde::Serialize;
use std::time::Duration;
use tally_common::api::{
    ApiResponse, ConfigDocument, EventPayload, PersonPayload, WeeklyPayload,
};
use tracing::debug;

pub const CONFIG_PATH: &str = "/v1/config";
pub const EVENTS_PATH: &str = "/v1/events";
pub const WEEKLY_PATH: &str = "/v1/weekly";
pub const PEOPLE_PATH: &str = "/v1/people";

const APPS_SCRIPT_MARKER: &str = "script.google.com/macros/s/";

/// How a backend wants to be addressed and authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFlavor {
    /// Google Apps Script web app: one URL, route in `?path=`, token only in the
    /// query string, and a `text/plain` body to avoid a CORS preflight.
    AppsScript,
    Standard,
}

impl BackendFlavor {
    pub fn detect(base_url: &str) -> Self {
        if base_url.contains(APPS_SCRIPT_MARKER) {
            Self::AppsScript
        } else {
            Self::Standard
        }
    }
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".into()
    } else if path.starts_with('/') {
        path.into()
    } else {
        format!("/{path}")
    }
}

fn set_query_param(url: &mut Url, key: &str, value: &str) {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != key)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(key, value);
}

/// Full request URL for a backend route. The token is always sent as a query
/// parameter; an empty token is left out.
pub fn build_url(base: &str, path: &str, token: &str) -> String {
    let path = normalize_path(path);
    let flavor = BackendFlavor::detect(base);

    let parsed = match flavor {
        BackendFlavor::AppsScript => Url::parse(base).map(|mut url| {
            set_query_param(&mut url, "path", &path);
            url
        }),
        BackendFlavor::Standard => Url::parse(&format!("{}{path}", base.trim_end_matches('/'))),
    };

    match parsed {
        Ok(mut url) => {
            if !token.is_empty() {
                set_query_param(&mut url, "token", token);
            }
            url.to_string()
        }
        // Not a URL we can parse; build it by hand and let the request fail loudly.
        Err(_) => match flavor {
            BackendFlavor::AppsScript => {
                let sep = if base.contains('?') { '&' } else { '?' };
                format!("{base}{sep}path={}", urlencoding::encode(&path))
            }
            BackendFlavor::Standard => format!("{}{path}", base.trim_end_matches('/')),
        },
    }
}

async fn handle_response_error(res: Response) -> Result<Response> {
    let status = res.status();
    if status == StatusCode::SERVICE_UNAVAILABLE {
        bail!("Service unavailable.");
    }

    if !status.is_success() {
        bail!("There was an error with the service: Status {status:?}.");
    }

    Ok(res)
}

#[derive(Serialize)]
struct Authenticated<'a, T: Serialize> {
    #[serde(flatten)]
    payload: &'a T,
    auth_token: &'a str,
}

/// Raw outcome of a config read, used by the connection test which has to tell
/// HTTP failures apart from application-level ones.
#[derive(Debug)]
pub struct ConfigProbe {
    pub status: StatusCode,
    pub body: Option<serde_json::Value>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    flavor: BackendFlavor,
}

impl ApiClient {
    pub fn new(credentials: &Credentials, timeout: Duration) -> Result<Self> {
        if !credentials.is_complete() {
            bail!("Missing backend URL or API token");
        }

        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: credentials.backend_url.clone(),
            token: credentials.api_token.clone(),
            flavor: BackendFlavor::detect(&credentials.backend_url),
        })
    }

    fn url(&self, path: &str) -> String {
        build_url(&self.base_url, path, &self.token)
    }

    fn config_request(&self) -> Result<Request> {
        let mut req = self.http.get(self.url(CONFIG_PATH));
        if self.flavor == BackendFlavor::Standard {
            req = req.bearer_auth(&self.token);
        }
        Ok(req.build()?)
    }

    /// Apps Script gets the token in the query only and a `text/plain` body.
    fn post_request<T: Serialize>(&self, path: &str, payload: &T) -> Result<Request> {
        let body = Authenticated {
            payload,
            auth_token: &self.token,
        };

        let req = self.http.post(self.url(path));
        let req = match self.flavor {
            BackendFlavor::AppsScript => req
                .header(CONTENT_TYPE, "text/plain;charset=utf-8")
                .body(serde_json::to_string(&body)?),
            BackendFlavor::Standard => req.bearer_auth(&self.token).json(&body),
        };
        Ok(req.build()?)
    }

    async fn get_config_response(&self) -> Result<Response> {
        Ok(self.http.execute(self.config_request()?).await?)
    }

    /// Fetch the config document. Only a body with `status == "ok"` is accepted.
    pub async fn config(&self) -> Result<ConfigDocument> {
        let res = self.get_config_response().await?;
        let res = handle_response_error(res).await?;
        let doc = res.json::<ConfigDocument>().await?;

        if doc.status != tally_common::api::STATUS_OK {
            bail!("Config rejected with status '{}'", doc.status);
        }

        Ok(doc)
    }

    pub async fn probe_config(&self) -> Result<ConfigProbe> {
        let res = self.get_config_response().await?;
        let status = res.status();
        let body = res.json::<serde_json::Value>().await.ok();
        Ok(ConfigProbe { status, body })
    }

    /// POST a payload with `auth_token` merged into the body.
    pub async fn post_json<T: Serialize>(&self, path: &str, payload: &T) -> Result<ApiResponse> {
        debug!("POST {path}");
        let req = self.post_request(path, payload)?;

        let res = self.http.execute(req).await?;
        let res = handle_response_error(res).await?;
        let res = res.json::<ApiResponse>().await?;
        Ok(res)
    }

    pub async fn post_event(&self, payload: &EventPayload) -> Result<ApiResponse> {
        self.post_json(EVENTS_PATH, payload).await
    }

    pub async fn post_weekly(&self, payload: &WeeklyPayload) -> Result<ApiResponse> {
        self.post_json(WEEKLY_PATH, payload).await
    }

    pub async fn post_person(&self, payload: &PersonPayload) -> Result<ApiResponse> {
        self.post_json(PEOPLE_PATH, payload).await
    }
}
