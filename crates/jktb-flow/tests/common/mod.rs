//! Shared fixtures: a scripted transport standing in for the portal.

#![allow(dead_code)]

use async_trait::async_trait;
use jktb_core::{AppConfig, Credentials, Endpoints};
use jktb_flow::{CaptchaClassifier, ClassifierError, ReportWorkflow};
use jktb_http::{HttpRequest, HttpResponse, Session, Transport, TransportError};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const BASE: &str = "http://portal.test";

pub fn url(path: &str) -> String {
    format!("{BASE}{path}")
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.user = Credentials {
        username: "2019000001".to_string(),
        password: "correct horse".to_string(),
        school_name: "哈尔滨工业大学（威海）".to_string(),
        wechat_open_id: "oWx123".to_string(),
        user_agent: "Mozilla/5.0 (jktb tests)".to_string(),
    };
    config.endpoints = Endpoints {
        login_page: url("/sfrzwx/auth/login"),
        verify_code: url("/sfrzwx/auth/code"),
        login: url("/sfrzwx/auth/doLogin"),
        wechat_code: url("/sfrzwx/wechat/code"),
        oauth2: url("/api/oauth2"),
        today_forms: url("/api/forms/today"),
        history_forms: url("/api/forms/history"),
        today_form_detail: url("/api/forms/today/detail"),
        history_form_detail: url("/api/forms/history/detail"),
        submit: url("/api/forms/submit"),
    };
    config
}

#[derive(Default)]
struct Script {
    queued: HashMap<String, VecDeque<HttpResponse>>,
    fallback: HashMap<String, HttpResponse>,
    seen: Vec<HttpRequest>,
}

/// Answers requests from per-URL queues and records everything it receives.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Queue a one-shot response for `url`.
    pub fn push(&self, url: &str, response: HttpResponse) {
        self.script
            .lock()
            .unwrap()
            .queued
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Response used for `url` once its queue is empty.
    pub fn always(&self, url: &str, response: HttpResponse) {
        self.script
            .lock()
            .unwrap()
            .fallback
            .insert(url.to_string(), response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.script.lock().unwrap().seen.clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<HttpRequest> {
        self.requests().into_iter().filter(|r| r.url == url).collect()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests_to(url).len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> jktb_http::Result<HttpResponse> {
        let mut script = self.script.lock().unwrap();
        let url = request.url.clone();
        script.seen.push(request);

        if let Some(response) = script.queued.get_mut(&url).and_then(VecDeque::pop_front) {
            return Ok(response);
        }
        script
            .fallback
            .get(&url)
            .cloned()
            .ok_or_else(|| TransportError::Connection(format!("nothing scripted for {url}")))
    }
}

/// Always answers with the same text and counts how often it was asked.
#[derive(Clone)]
pub struct FixedClassifier {
    answer: String,
    calls: Arc<AtomicUsize>,
}

impl FixedClassifier {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptchaClassifier for FixedClassifier {
    async fn classify(&self, image: &[u8]) -> Result<String, ClassifierError> {
        assert!(!image.is_empty(), "classifier received an empty image");
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

// Portal responses

pub fn captcha() -> HttpResponse {
    HttpResponse::json(&json!({
        "data": {"content": "data:image/png;base64,iVBORw0KGgo="}
    }))
}

pub fn login_accepted() -> HttpResponse {
    HttpResponse::redirect(url("/sfrzwx/home/index"))
}

pub fn login_rejected() -> HttpResponse {
    HttpResponse::redirect(url("/sfrzwx/auth/login?openid=oWx123&dlfs=zhmm"))
}

pub fn wechat_redirect() -> HttpResponse {
    HttpResponse::redirect(url("/wx/callback?code=071CODE&state=STATE"))
}

pub fn ok() -> HttpResponse {
    HttpResponse::new(200)
}

pub fn today_forms(status: i64) -> HttpResponse {
    HttpResponse::json(&json!({
        "data": {"content": [{"bdtbslid": "today-1", "tbzt": status, "bdmc": "学生每日健康填报"}]}
    }))
}

pub fn history_forms() -> HttpResponse {
    HttpResponse::json(&json!({
        "data": {"content": [
            {"bdtbslid": "yday-1", "tbzt": 1, "tbrq": "2026-10-18 07:55:02"},
            {"bdtbslid": "older-1", "tbzt": 1, "tbrq": "2026-10-17 08:10:00"}
        ]}
    }))
}

pub fn standard_items() -> Value {
    json!([
        {"bt": "今日体温", "nr": "36.5", "xh": 1},
        {"bt": "当前所在地", "nr": "山东省威海市", "xh": 2},
        {"bt": "是否有发热症状", "nr": "否", "xh": 3}
    ])
}

pub fn detail(items: Value) -> HttpResponse {
    HttpResponse::json(&json!({
        "data": {"content": {
            "xm": "张三",
            "zzjgmc": "计算机科学与技术学院",
            "list": items
        }}
    }))
}

/// Script every stage up to and including `todayForms`.
pub fn script_until_forms(transport: &ScriptedTransport, today_status: i64) {
    let config = test_config();
    transport.always(&config.endpoints.verify_code, captcha());
    transport.push(&config.endpoints.login, login_accepted());
    transport.always(&url("/sfrzwx/home/index"), ok());
    transport.push(&config.endpoints.wechat_code, wechat_redirect());
    transport.push(&config.endpoints.oauth2, ok());
    transport.push(&config.endpoints.today_forms, today_forms(today_status));
}

/// Script a full successful run where yesterday's form has `yesterday_items`.
pub fn script_run(transport: &ScriptedTransport, yesterday_items: Value) {
    let config = test_config();
    script_until_forms(transport, 0);
    transport.push(&config.endpoints.history_forms, history_forms());
    transport.push(&config.endpoints.today_form_detail, detail(standard_items()));
    transport.push(&config.endpoints.history_form_detail, detail(yesterday_items));
    transport.push(&config.endpoints.submit, ok());
}

pub fn session(config: &AppConfig, transport: &ScriptedTransport) -> Session {
    Session::new(transport.clone(), config.base_headers())
}

pub fn workflow<'a>(
    config: &'a AppConfig,
    transport: &ScriptedTransport,
    classifier: &FixedClassifier,
) -> ReportWorkflow<'a> {
    ReportWorkflow::new(config, session(config, transport), Box::new(classifier.clone()))
}
