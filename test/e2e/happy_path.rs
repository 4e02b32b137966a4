//! End-to-end calendar import test.
//!
//! Runs the scheduler against the HTTP store client and a stub store server,
//! verifying:
//!
//! 1. Existing schedules are listed and deleted
//! 2. The calendar is merged into one window per day
//! 3. START then FINISH actions are created with the merged window
//! 4. A busy store aborts the import before anything is created
//!
//! ## Running
//!
//! ```bash
//! cargo test -p fleetcal-e2e --test happy_path
//! ```

use std::sync::Arc;

use chrono::{FixedOffset, TimeZone, Utc};
use fleetcal_scheduler::{IcsCalendar, ImportSummary, Scheduler, SchedulerConfig, SchedulerError};
use fleetcal_store::{HttpScheduleStore, StoreConfig};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ACTIONS_PATH: &str = "/v1/groups/web-prod/scheduled-actions";

/// Two one-hour meetings on 2021-04-05 (09:00 and 13:00 at -07:00), an
/// all-day offsite, and a meeting in May that falls outside the window.
const CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//fleetcal//e2e//EN\r\n\
BEGIN:VEVENT\r\n\
UID:1\r\n\
SUMMARY:Meet\r\n\
DTSTART:20210405T200000Z\r\n\
DTEND:20210405T210000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:2\r\n\
SUMMARY:Meet\r\n\
DTSTART:20210405T160000Z\r\n\
DTEND:20210405T170000Z\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT15M\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:3\r\n\
SUMMARY:Offsite\r\n\
DTSTART;VALUE=DATE:20210407\r\n\
DTEND;VALUE=DATE:20210408\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:4\r\n\
SUMMARY:Planning\r\n\
DTSTART:20210503T160000Z\r\n\
DTEND:20210503T170000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn scheduler(server: &MockServer) -> Scheduler {
    let store = HttpScheduleStore::new(&StoreConfig {
        base_url: server.uri(),
        group: "web-prod".to_string(),
        token: Some("e2e-token".to_string()),
    })
    .unwrap();

    let config = SchedulerConfig {
        jitter_secs: 0,
        ..SchedulerConfig::default()
    };
    Scheduler::new(Arc::new(store), config)
}

fn tz() -> FixedOffset {
    FixedOffset::west_opt(7 * 3600).unwrap()
}

async fn mount_existing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ACTIONS_PATH))
        .and(query_param("max_records", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "name": "Old/START/-0700",
                    "time": "2021-03-30T15:00:00Z",
                    "min_size": 6,
                    "max_size": 20,
                    "desired_capacity": 6
                },
                {
                    "name": "Old/FINISH/-0700",
                    "time": "2021-03-30T23:00:00Z",
                    "min_size": 2,
                    "max_size": 20,
                    "desired_capacity": 2
                }
            ]
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_import_replaces_schedules() {
    init_tracing();
    let server = MockServer::start().await;
    mount_existing(&server).await;

    for name in ["Old/START/-0700", "Old/FINISH/-0700"] {
        Mock::given(method("DELETE"))
            .and(path(ACTIONS_PATH))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("POST"))
        .and(path(ACTIONS_PATH))
        .and(body_json(json!({
            "name": "Meet Meet 04-05/START/-0700",
            "time": "2021-04-05T15:15:00Z",
            "min_size": 4,
            "max_size": 20,
            "desired_capacity": 4
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ACTIONS_PATH))
        .and(body_json(json!({
            "name": "Meet Meet 04-05/FINISH/-0700",
            "time": "2021-04-05T21:45:00Z",
            "min_size": 2,
            "max_size": 20,
            "desired_capacity": 2
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2021, 4, 1, 12, 0, 0).unwrap();
    let calendar = IcsCalendar::new(CALENDAR.as_bytes(), tz());

    let summary = scheduler(&server)
        .import_calendar(calendar, tz(), now)
        .await
        .unwrap();
    assert_eq!(summary, ImportSummary { deleted: 2, created: 1 });

    let requests = server.received_requests().await.unwrap();
    let sequence: Vec<_> = requests.iter().map(|r| r.method.to_string()).collect();
    assert_eq!(sequence, vec!["GET", "DELETE", "DELETE", "POST", "POST"]);

    let starts_first = String::from_utf8_lossy(&requests[3].body).contains("/START/");
    assert!(starts_first, "START must be created before FINISH");

    for request in &requests {
        let auth = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok());
        assert_eq!(auth, Some("Bearer e2e-token"));
    }
}

#[tokio::test]
async fn test_busy_store_aborts_import() {
    init_tracing();
    let server = MockServer::start().await;
    mount_existing(&server).await;

    Mock::given(method("DELETE"))
        .and(path(ACTIONS_PATH))
        .and(query_param("name", "Old/START/-0700"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "ResourceContention",
            "message": "group is being updated"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(ACTIONS_PATH))
        .and(query_param("name", "Old/FINISH/-0700"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ACTIONS_PATH))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let now = Utc.with_ymd_and_hms(2021, 4, 1, 12, 0, 0).unwrap();
    let calendar = IcsCalendar::new(CALENDAR.as_bytes(), tz());

    let err = scheduler(&server)
        .import_calendar(calendar, tz(), now)
        .await
        .unwrap_err();

    assert!(matches!(err, SchedulerError::RemoteContention(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_listing_reports_merged_schedules() {
    init_tracing();
    let server = MockServer::start().await;
    mount_existing(&server).await;

    let schedules = scheduler(&server).get_schedules().await.unwrap();

    assert_eq!(schedules.len(), 1);
    let old = &schedules[0];
    assert_eq!(old.name, "Old");
    assert_eq!(old.size, 6);
    assert_eq!(old.tz, "-0700");
    assert_eq!(old.ids, vec!["Old/START/-0700", "Old/FINISH/-0700"]);
    assert!(old.is_complete());
}
