use bytes::Bytes;
use chrono::NaiveDateTime;
use http_body_util::{BodyExt, Full, Limited};
use hyper::{
    body::{Body, Incoming},
    header::{HeaderValue, CONTENT_TYPE},
    service::Service,
    Method, Request, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{sync::watch, time::Instant};
use tracing::{error, info};
use url_escape::decode;

use std::{
    collections::HashMap, convert::Infallible, error::Error as StdError, future::Future, pin::Pin,
    str::FromStr, sync::Arc,
};

use crate::{
    database::sqlite::ScheduleStore,
    error::StoreError,
    timing::{
        daily::{day_key_of, DaySchedule},
        local_now::Clock,
        monitor::ScheduleSender,
        schedule::WeeklySchedule,
        status::{status_at, StatusOptions, StatusResult},
    },
};

use super::myresponse::{CurrentStatus, ErrorBody, Updated};

const MAX_BODY_BYTES: usize = 64 * 1024;

type HttpResponse = Response<Full<Bytes>>;

/// The Server
///
/// Handles the operating hours endpoints. Reads are answered from the in-memory schedule
/// and the live status published by the `StatusMonitor`. Writes go to the `ScheduleStore`
/// first and then replace the in-memory schedule wholesale, which wakes the monitor.
///
/// One clone is handed to each connection task.
#[derive(Clone)]
pub struct Server {
    store: ScheduleStore,
    schedule: Arc<ScheduleSender>,
    live_status: watch::Receiver<StatusResult>,
    clock: Arc<dyn Clock>,
    options: StatusOptions,
}

impl Server {
    pub fn setup(
        store: ScheduleStore,
        schedule: Arc<ScheduleSender>,
        live_status: watch::Receiver<StatusResult>,
        clock: Arc<dyn Clock>,
        options: StatusOptions,
    ) -> Self {
        Self {
            store,
            schedule,
            live_status,
            clock,
            options,
        }
    }

    /// Route a request and log the outcome.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match (&method, path.as_str()) {
            (&Method::GET, "/cafe/operational-hours") => self.list_hours(),
            (&Method::PUT, "/cafe/operational-hours") => self.replace_hours(req).await,
            (&Method::GET, "/api/operational-hours/today") => self.today(&req),
            (&Method::PUT, "/api/operational-hours/single") => self.update_single(req).await,
            (&Method::GET, "/api/operational-hours/status") => self.current_status(&req),
            _ => Self::not_found(""),
        };

        info!(
            %method,
            %path,
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "handled request"
        );
        response
    }

    /// Parses the query parameters and returns a `hashmap` of key pair values
    /// Returns `None` if the parameters are malformed
    fn parse_params(text: &str) -> Option<HashMap<String, String>> {
        let mut map: HashMap<String, String> = HashMap::new();
        for pairs in text.split('&') {
            let mut iterator = pairs.split('=');
            map.insert(
                iterator.next()?.to_string(),
                decode(iterator.next()?).to_string(),
            );
        }
        Some(map)
    }

    /// The instant to evaluate at: `?at=YYYY-MM-DDTHH:MM:SS` when given, otherwise now.
    fn reference_instant<B>(&self, req: &Request<B>) -> Result<Option<NaiveDateTime>, HttpResponse> {
        let Some(params) = req.uri().query() else {
            return Ok(None);
        };
        let Some(map) = Self::parse_params(params) else {
            return Err(Self::bad_request("Malformed Parameters."));
        };
        match map.get("at") {
            None => Ok(None),
            Some(at) => NaiveDateTime::from_str(at)
                .map(Some)
                .map_err(|_| Self::bad_request("Malformed Date")),
        }
    }

    async fn read_json<T, B>(req: Request<B>) -> Result<T, HttpResponse>
    where
        T: DeserializeOwned,
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => return Err(Self::bad_request(&format!("Could not read body. {}", err))),
        };
        serde_json::from_slice(&body).map_err(|err| Self::bad_request(&err.to_string()))
    }

    /// Run `update` against the current schedule and publish the result.
    ///
    /// The update runs while the channel is locked, so concurrent writers are applied one
    /// after the other and the published schedule always matches the store.
    fn apply<F>(&self, update: F) -> Result<Arc<WeeklySchedule>, StoreError>
    where
        F: FnOnce(&WeeklySchedule) -> Result<WeeklySchedule, StoreError>,
    {
        let mut outcome = Ok(());
        self.schedule.send_if_modified(|current| match update(&**current) {
            Ok(next) => {
                *current = Arc::new(next);
                true
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome.map(|_| Arc::clone(&self.schedule.borrow()))
    }

    /// GET /cafe/operational-hours
    fn list_hours(&self) -> HttpResponse {
        let schedule = Arc::clone(&self.schedule.borrow());
        Self::ok_data(&*schedule)
    }

    /// PUT /cafe/operational-hours
    ///
    /// Replaces the whole week. Days missing from the body lose their hours.
    async fn replace_hours<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let replacement: WeeklySchedule = match Self::read_json(req).await {
            Ok(schedule) => schedule,
            Err(response) => return response,
        };
        let store = &self.store;
        let result = self.apply(|_| {
            store.replace_schedule(&replacement)?;
            Ok(replacement.clone())
        });
        match result {
            Ok(schedule) => Self::ok_data(Updated::week(schedule.len())),
            Err(err) => Self::server_error(&err),
        }
    }

    /// PUT /api/operational-hours/single
    ///
    /// Windows that close before they open are accepted as overnight hours.
    async fn update_single<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let timing: DaySchedule = match Self::read_json(req).await {
            Ok(timing) => timing,
            Err(response) => return response,
        };
        let store = &self.store;
        let result = self.apply(|current| {
            store.upsert_day(&timing)?;
            let mut next = current.clone();
            next.set(timing);
            Ok(next)
        });
        match result {
            Ok(schedule) => Self::ok_data(Updated::single(
                day_key_of(timing.day()),
                timing.display_window(),
                schedule.len(),
            )),
            Err(err) => Self::server_error(&err),
        }
    }

    /// GET /api/operational-hours/today
    fn today<B>(&self, req: &Request<B>) -> HttpResponse {
        let at = match self.reference_instant(req) {
            Ok(at) => at.unwrap_or_else(|| self.clock.now()),
            Err(response) => return response,
        };
        let schedule = Arc::clone(&self.schedule.borrow());
        Self::ok_data(status_at(&schedule, at, self.options))
    }

    /// GET /api/operational-hours/status
    ///
    /// Without `at` this is the monitor's last published status.
    fn current_status<B>(&self, req: &Request<B>) -> HttpResponse {
        match self.reference_instant(req) {
            Ok(Some(at)) => {
                let schedule = Arc::clone(&self.schedule.borrow());
                Self::ok_data(CurrentStatus::from(&status_at(&schedule, at, self.options)))
            }
            Ok(None) => Self::ok_data(CurrentStatus::from(&*self.live_status.borrow())),
            Err(response) => response,
        }
    }

    fn json_response(status: StatusCode, body: Bytes) -> HttpResponse {
        let mut res = Response::new(Full::new(body));
        *res.status_mut() = status;
        res.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        res
    }

    fn error_response(status: StatusCode, message: &str) -> HttpResponse {
        match serde_json::to_vec(&ErrorBody::new(message)) {
            Ok(body) => Self::json_response(status, Bytes::from(body)),
            Err(_) => Self::json_response(status, Bytes::new()),
        }
    }

    /// Return a 200 OK response with the data provided.
    fn ok_data<T: Serialize>(body: T) -> HttpResponse {
        match serde_json::to_vec(&body) {
            Ok(data) => Self::json_response(StatusCode::OK, Bytes::from(data)),
            Err(err) => {
                error!(error = %err, "could not serialize response");
                Self::error_response(StatusCode::INTERNAL_SERVER_ERROR, "Could not serialize response")
            }
        }
    }

    /// Return a 500 Internal Server Error response. The cause is logged, not sent.
    fn server_error(err: &StoreError) -> HttpResponse {
        error!(error = %err, "storage failure");
        Self::error_response(StatusCode::INTERNAL_SERVER_ERROR, "Storage failure")
    }

    /// Return a 404 Not Found response with the message provided. The message here is optional.
    /// Leave it empty for no message.
    fn not_found(message: &str) -> HttpResponse {
        if message.is_empty() {
            let mut res = Response::new(Full::new(Bytes::new()));
            *res.status_mut() = StatusCode::NOT_FOUND;
            return res;
        }
        Self::error_response(StatusCode::NOT_FOUND, message)
    }

    /// Return a 400 Bad Request response with the message provided.
    fn bad_request(message: &str) -> HttpResponse {
        Self::error_response(StatusCode::BAD_REQUEST, message)
    }
}

impl Service<Request<Incoming>> for Server {
    type Response = HttpResponse;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let server = self.clone();
        Box::pin(async move { Ok(server.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::sqlite::testing::memory_store,
        timing::{local_now::testing::FixedClock, monitor::StatusMonitor},
    };
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Harness {
        server: Server,
        store: ScheduleStore,
        clock: Arc<FixedClock>,
        monitor: StatusMonitor,
    }

    // 2024-01-01 is a Monday
    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn harness(initial: WeeklySchedule) -> Harness {
        let store = memory_store();
        store.replace_schedule(&initial).unwrap();
        let (sender, receiver) = watch::channel(Arc::new(initial));
        let clock = Arc::new(FixedClock::new(monday(12, 0)));
        let options = StatusOptions::default();
        let monitor =
            StatusMonitor::spawn(receiver, clock.clone(), options, Duration::from_secs(30));
        let server = Server::setup(
            store.clone(),
            Arc::new(sender),
            monitor.subscribe(),
            clock.clone(),
            options,
        );
        Harness {
            server,
            store,
            clock,
            monitor,
        }
    }

    fn office_hours() -> WeeklySchedule {
        WeeklySchedule::from_days([DaySchedule::parse("mon", "08:00", "17:00").unwrap()]).unwrap()
    }

    async fn send(server: &Server, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap();
        let res = server.handle(req).await;
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let h = harness(office_hours());
        let (status, body) = send(&h.server, Method::GET, "/api/menus", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Value::Null);
        let (status, _) = send(&h.server, Method::DELETE, "/cafe/operational-hours", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_stored_hours() {
        let h = harness(office_hours());
        let (status, body) = send(&h.server, Method::GET, "/cafe/operational-hours", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"day": "mon", "opens_at": "08:00", "closes_at": "17:00"}])
        );
    }

    #[tokio::test]
    async fn today_uses_clock_or_at_param() {
        let h = harness(office_hours());
        let (status, body) = send(&h.server, Method::GET, "/api/operational-hours/today", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_open"], true);
        assert_eq!(body["display_window"], "08:00-17:00");
        assert_eq!(body["badge"], "open");

        h.clock.set(monday(18, 0));
        let (_, body) = send(&h.server, Method::GET, "/api/operational-hours/today", "").await;
        assert_eq!(body["label"], "Closed now");

        let (_, body) = send(
            &h.server,
            Method::GET,
            "/api/operational-hours/today?at=2024-01-03T12%3A00%3A00",
            "",
        )
        .await;
        assert_eq!(body["label"], "No schedule set");
        assert_eq!(body["day"], "Wednesday");

        let (status, body) = send(
            &h.server,
            Method::GET,
            "/api/operational-hours/today?at=yesterday",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Malformed Date");
    }

    #[tokio::test]
    async fn status_reads_live_monitor() {
        let h = harness(office_hours());
        let (status, body) =
            send(&h.server, Method::GET, "/api/operational-hours/status", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "Open now", "is_open": true}));
        assert_eq!(h.monitor.latest().label, "Open now");

        let (_, body) = send(
            &h.server,
            Method::GET,
            "/api/operational-hours/status?at=2024-01-01T07:59:00",
            "",
        )
        .await;
        assert_eq!(body, json!({"status": "Closed now", "is_open": false}));
    }

    #[tokio::test]
    async fn replace_hours_persists_and_wakes_monitor() {
        let h = harness(WeeklySchedule::new());
        let mut updates = h.monitor.subscribe();
        assert_eq!(updates.borrow_and_update().label, "No schedule set");

        let (status, body) = send(
            &h.server,
            Method::PUT,
            "/cafe/operational-hours",
            r#"[{"hari": "Senin", "buka": "07:00", "tutup": "22:00"},
                {"day": "fri", "opens_at": "19:00", "closes_at": "02:00"}]"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["days"], 2);
        assert_eq!(h.store.load_schedule().unwrap().len(), 2);

        updates.changed().await.unwrap();
        assert!(updates.borrow().is_open);
    }

    #[tokio::test]
    async fn replace_hours_rejects_bad_input() {
        let h = harness(office_hours());
        for body in [
            r#"[{"day": "mon", "opens_at": "8:00", "closes_at": "17:00"}]"#,
            r#"[{"day": "someday", "opens_at": "08:00", "closes_at": "17:00"}]"#,
            r#"[{"day": "mon", "opens_at": "08:00", "closes_at": "17:00"},
                {"day": "senin", "opens_at": "09:00", "closes_at": "17:00"}]"#,
            "not json",
        ] {
            let (status, body) =
                send(&h.server, Method::PUT, "/cafe/operational-hours", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(body["error"].is_string());
        }
        assert_eq!(h.store.load_schedule().unwrap(), office_hours());
    }

    #[tokio::test]
    async fn single_day_upsert_accepts_overnight() {
        let h = harness(office_hours());
        let (status, body) = send(
            &h.server,
            Method::PUT,
            "/api/operational-hours/single",
            r#"{"hari": "Jumat", "buka": "19:00", "tutup": "02:00"}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["day"], "fri");
        assert_eq!(body["window"], "19:00-02:00");
        assert_eq!(body["days"], 2);

        let (_, body) = send(&h.server, Method::GET, "/cafe/operational-hours", "").await;
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(h.store.load_schedule().unwrap().len(), 2);

        let (_, body) = send(
            &h.server,
            Method::GET,
            "/api/operational-hours/today?at=2024-01-05T23:30:00",
            "",
        )
        .await;
        assert_eq!(body["is_open"], true);
    }
}
