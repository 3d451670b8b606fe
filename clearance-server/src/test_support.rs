//! In-process feature service for tests.
//!
//! Serves canned JSON under a MapServer-shaped root on `127.0.0.1:0` and
//! records every request URL. Routes are keyed by the path below the
//! service root, e.g. `"2/query"`. A route key may carry a
//! `?relationshipId=N` suffix to distinguish `queryRelatedRecords` calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::arcgis::{FeatureServiceClient, ServiceConfig, combine_url};

const ROOT_PATH: &str = "/arcgis/rest/services/Bridge/BridgeVerticalClearance/MapServer";

const UNKNOWN_ROUTE: &str =
    r#"{"error": {"code": 404, "message": "Requested resource not found", "details": []}}"#;

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    body: String,
}

#[derive(Debug, Default)]
struct Route {
    /// The last response repeats once the others are used up.
    responses: VecDeque<Canned>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct FixtureState {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct FixtureServerBuilder {
    routes: HashMap<String, Route>,
}

impl FixtureServerBuilder {
    /// Answer `key` with HTTP 200 and `body`.
    pub fn json(self, key: &str, body: &str) -> Self {
        self.sequence(key, [(200, body)])
    }

    /// Answer `key` with each response in turn.
    pub fn sequence<'a>(
        mut self,
        key: &str,
        responses: impl IntoIterator<Item = (u16, &'a str)>,
    ) -> Self {
        let route = self.routes.entry(key.to_string()).or_default();
        route.responses = responses
            .into_iter()
            .map(|(status, body)| Canned {
                status,
                body: body.to_string(),
            })
            .collect();
        self
    }

    /// Hold responses to `key` for `delay`.
    pub fn delay(mut self, key: &str, delay: Duration) -> Self {
        self.routes.entry(key.to_string()).or_default().delay = Some(delay);
        self
    }

    pub async fn start(self) -> FixtureServer {
        let state = Arc::new(FixtureState {
            routes: Mutex::new(self.routes),
            requests: Mutex::new(Vec::new()),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(serve).with_state(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let origin = Url::parse(&format!("http://{addr}")).unwrap();
        FixtureServer {
            root: origin.join(ROOT_PATH).unwrap(),
            origin,
            state,
        }
    }
}

/// A running fixture server. It stops when the test's runtime shuts down.
pub struct FixtureServer {
    origin: Url,
    root: Url,
    state: Arc<FixtureState>,
}

impl FixtureServer {
    pub fn builder() -> FixtureServerBuilder {
        FixtureServerBuilder::default()
    }

    /// The MapServer root.
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// `{root}/{path}`.
    pub fn url(&self, path: &str) -> Url {
        combine_url(&self.root, &[path]).unwrap()
    }

    /// A client for this server with fast retries.
    pub fn client(&self) -> FeatureServiceClient {
        FeatureServiceClient::new(ServiceConfig::new(self.root.clone()).with_retries(2, 1))
            .unwrap()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Url> {
        self.state
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| self.origin.join(r).unwrap())
            .collect()
    }
}

async fn serve(State(state): State<Arc<FixtureState>>, uri: Uri) -> Response {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    state.requests.lock().unwrap().push(path_and_query);

    let relative = uri
        .path()
        .strip_prefix(ROOT_PATH)
        .unwrap_or(uri.path())
        .trim_matches('/')
        .to_string();
    let relationship = uri.query().and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(k, _)| k == "relationshipId")
            .map(|(_, v)| format!("{relative}?relationshipId={v}"))
    });

    let (canned, delay) = {
        let mut routes = state.routes.lock().unwrap();
        let key = match relationship {
            Some(k) if routes.contains_key(&k) => k,
            _ => relative,
        };
        match routes.get_mut(&key) {
            Some(route) => {
                let canned = if route.responses.len() > 1 {
                    route.responses.pop_front()
                } else {
                    route.responses.front().cloned()
                };
                (canned, route.delay)
            }
            None => (None, None),
        }
    };

    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let Canned { status, body } = canned.unwrap_or_else(|| Canned {
        status: 200,
        body: UNKNOWN_ROUTE.to_string(),
    });
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

/// Crossing 5672 as every endpoint would serve it.
///
/// Two lanes each way, an advisory note for the increasing direction, and a
/// document for each direction. The primary layer's dates are epoch
/// milliseconds and the extension's are ISO strings with an offset; both
/// name the same instants.
pub fn sample_crossing_fixtures() -> FixtureServerBuilder {
    const LANES: &str = r#"[
        {"attributes": {"CrossingLocationId": 5672, "Direction": "I", "LaneNumber": 2, "MinimumVerticalClearance": 188}},
        {"attributes": {"CrossingLocationId": 5672, "Direction": "D", "LaneNumber": 1, "MinimumVerticalClearance": 201}},
        {"attributes": {"CrossingLocationId": 5672, "Direction": "I", "LaneNumber": 1, "MinimumVerticalClearance": 190}},
        {"attributes": {"CrossingLocationId": 5672, "Direction": "D", "LaneNumber": 2, "MinimumVerticalClearance": 203}}
    ]"#;
    const ADVISORIES: &str = r#"[
        {"attributes": {"CrossingLocationId": 5672, "Direction": "I", "AdvisoryNote": "Use center lane"}}
    ]"#;
    const DOCUMENTS: &str = r#"[
        {"attributes": {"CrossingLocationId": 5672, "Direction": "I", "Document": 1234}},
        {"attributes": {"CrossingLocationId": 5672, "Direction": "D", "Document": 1235}}
    ]"#;

    let query = |rows: &str| format!(r#"{{"features": {rows}}}"#);
    let related = |rows: &str| {
        format!(r#"{{"relatedRecordGroups": [{{"objectId": 5672, "relatedRecords": {rows}}}]}}"#)
    };

    FixtureServer::builder()
        .json(
            "0/5672",
            r#"{"feature": {"attributes": {
                "OBJECTID": 5672,
                "CrossingLocationId": 5672,
                "StateStructureId": "0004321B",
                "BridgeNumber": "405/46",
                "StateRouteIdentifier": "405",
                "SRMP": 13.47,
                "ABInd": "A",
                "DirectionInd": "B",
                "CrossingDesc": "SR 405 under NE 8th St",
                "OnUnderCode": "UNDER",
                "IncreasingDirReviewCmltInd": "Y",
                "DecreasingDirReviewCmltInd": "N",
                "RecordCreateDate": 1433142000000,
                "RecordUpdateDate": 1500000000000
            }}}"#,
        )
        .json("2/query", &query(LANES))
        .json("3/query", &query(DOCUMENTS))
        .json("4/query", &query(ADVISORIES))
        .json("0/queryRelatedRecords?relationshipId=0", &related(LANES))
        .json("0/queryRelatedRecords?relationshipId=1", &related(DOCUMENTS))
        .json("0/queryRelatedRecords?relationshipId=2", &related(ADVISORIES))
        .json(
            "exts/BridgeVC/crossing/5672",
            r#"{
                "CrossingLocation": {
                    "CrossingLocationId": 5672,
                    "StateStructureId": "0004321B",
                    "BridgeNumber": "405/46",
                    "StateRouteIdentifier": "405",
                    "SRMP": 13.47,
                    "ABInd": "A",
                    "DirectionInd": "B",
                    "CrossingDesc": "SR 405 under NE 8th St",
                    "OnUnderCode": "UNDER",
                    "IncreasingDirReviewCmltInd": true,
                    "DecreasingDirReviewCmltInd": false,
                    "RecordCreateDate": "2015-06-01T00:00:00-07:00",
                    "RecordUpdateDate": "2017-07-14T02:40:00Z"
                },
                "RelatedData": {
                    "Increase": {"Direction": "I", "Lanes": [190, 188], "Document": 1234, "AdvisoryNote": "Use center lane"},
                    "Decrease": {"Direction": "D", "Lanes": [201, 203], "Document": 1235, "AdvisoryNote": null}
                }
            }"#,
        )
}
