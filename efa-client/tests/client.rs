//! Integration tests for the EFA client (wiremock-based)

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use efa_client::{
    CoordFormat, DepartureOptions, EfaClient, EfaConfig, EfaError, LineOptions, LocationFilter,
    LocationType, SearchOptions, TransportError, TransportType,
};

async fn open_client(server: &MockServer) -> EfaClient {
    EfaClient::connect(EfaConfig::new(server.uri()).with_timeout(5))
        .await
        .unwrap()
}

fn stop(id: &str, name: &str, match_quality: i64) -> Value {
    json!({
        "id": id,
        "isGlobalId": true,
        "name": name,
        "disassembledName": name,
        "type": "stop",
        "coord": [49.45, 11.08],
        "productClasses": [2, 5],
        "matchQuality": match_quality,
        "properties": { "stopId": "3001704" }
    })
}

fn stop_finder(locations: Vec<Value>) -> Value {
    json!({
        "version": "10.6.14.22",
        "systemMessages": [],
        "locations": locations
    })
}

fn line(id: &str, number: &str, class: i64, destination: &str) -> Value {
    json!({
        "id": id,
        "name": format!("U-Bahn {number}"),
        "number": number,
        "description": format!("Fürth Hardhöhe - {destination}"),
        "product": { "id": 1, "class": class, "name": "U-Bahn", "iconId": 1 },
        "destination": { "id": "3000510", "name": destination, "type": "stop" },
        "operator": { "code": "VAG", "id": "VAG", "name": "VAG Nürnberg" },
        "properties": { "tripCode": 0 }
    })
}

async fn mount_json(server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{endpoint}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_locations_by_name_sorted_by_quality() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .and(query_param("outputFormat", "rapidJSON"))
        .and(query_param("type_sf", "any"))
        .and(query_param("name_sf", "Plärrer"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_finder(vec![
            stop("de:09564:704", "Plärrer", 50),
            stop("de:09564:705", "Plärrer (Nürnberg)", 90),
            stop("de:09564:706", "Plärrerstraße", 10),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let locations = client
        .locations_by_name("Plärrer", &SearchOptions::default())
        .await
        .unwrap();

    let qualities: Vec<i64> = locations.iter().map(|l| l.match_quality).collect();
    assert_eq!(qualities, vec![90, 50, 10]);

    let best = &locations[0];
    assert_eq!(best.id, "de:09564:705");
    assert_eq!(best.loc_type, LocationType::Stop);
    assert_eq!(
        best.transports,
        vec![TransportType::Subway, TransportType::Bus]
    );
    assert!(best.coord.is_some());
}

#[tokio::test]
async fn test_locations_by_name_applies_limit() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "XML_STOPFINDER_REQUEST",
        stop_finder(vec![
            stop("a", "A", 10),
            stop("b", "B", 30),
            stop("c", "C", 20),
        ]),
    )
    .await;

    let client = open_client(&server).await;
    let locations = client
        .locations_by_name("x", &SearchOptions::default().with_limit(2))
        .await
        .unwrap();

    let ids: Vec<&str> = locations.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);
}

#[tokio::test]
async fn test_locations_by_name_sends_filter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .and(query_param("anyObjFilter_sf", "6"))
        .and(query_param("doNotSearchForStops_sf", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_finder(vec![])))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let options = SearchOptions::default()
        .with_filter(LocationFilter::Stops)
        .with_filter(LocationFilter::Streets);
    let locations = client.locations_by_name("Plärrer", &options).await.unwrap();

    assert!(locations.is_empty());
}

#[tokio::test]
async fn test_locations_by_name_empty_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_finder(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let result = client
        .locations_by_name("", &SearchOptions::default())
        .await;

    assert!(matches!(result, Err(EfaError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_location_missing_name_reports_path() {
    let server = MockServer::start().await;

    let mut broken = stop("de:09564:705", "Plärrer", 50);
    broken.as_object_mut().unwrap().remove("name");
    mount_json(
        &server,
        "XML_STOPFINDER_REQUEST",
        stop_finder(vec![stop("de:09564:704", "Plärrer", 90), broken]),
    )
    .await;

    let client = open_client(&server).await;
    let err = client
        .locations_by_name("Plärrer", &SearchOptions::default())
        .await
        .unwrap_err();

    match err {
        EfaError::ResponseValidation(e) => {
            assert_eq!(e.path, "locations[1].name");
            assert_eq!(e.found, "missing");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_local_id_replaced_by_stop_id() {
    let server = MockServer::start().await;

    let mut local = stop("streetID:1500000034", "Plärrer", 50);
    local["isGlobalId"] = json!(false);
    mount_json(&server, "XML_STOPFINDER_REQUEST", stop_finder(vec![local])).await;

    let client = open_client(&server).await;
    let locations = client
        .locations_by_name("Plärrer", &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(locations[0].id, "3001704");
}

#[tokio::test]
async fn test_locations_by_coord() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .and(query_param("type_sf", "coord"))
        .and(query_param("name_sf", "11.08:49.45:WGS84[dd.ddddd]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_finder(vec![
            stop("near", "Near", 900),
            stop("far", "Far", 100),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let locations = client
        .locations_by_coord(11.08, 49.45, CoordFormat::Wgs84, &SearchOptions::default())
        .await
        .unwrap();

    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].id, "near");
}

#[tokio::test]
async fn test_closed_session_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stop_finder(vec![])))
        .expect(0)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    client.close().await;

    let result = client
        .locations_by_name("Plärrer", &SearchOptions::default())
        .await;
    assert!(matches!(result, Err(EfaError::SessionState(_))));

    let result = client.info().await;
    assert!(matches!(result, Err(EfaError::SessionState(_))));
}

#[tokio::test]
async fn test_timeout_leaves_session_usable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stop_finder(vec![]))
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/XML_STOPFINDER_REQUEST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(stop_finder(vec![stop("a", "A", 1)])),
        )
        .mount(&server)
        .await;

    let client = EfaClient::connect(EfaConfig::new(server.uri()).with_timeout(1))
        .await
        .unwrap();

    let err = client
        .locations_by_name("Plärrer", &SearchOptions::default())
        .await
        .unwrap_err();
    match err {
        EfaError::Transport(e) => assert!(e.is_timeout()),
        other => panic!("expected transport error, got {other:?}"),
    }

    assert!(client.is_open().await);
    let locations = client
        .locations_by_name("Plärrer", &SearchOptions::default())
        .await
        .unwrap();
    assert_eq!(locations.len(), 1);
}

fn system_info() -> Value {
    json!({
        "version": "10.6.14.22",
        "ptKernel": {
            "appVersion": "10.6.14.22",
            "dataFormat": "EFA10_06_01",
            "dataBuild": "2024-11-26T11:45:27Z"
        },
        "validity": { "from": "2024-11-01", "to": "2025-12-13" }
    })
}

#[tokio::test]
async fn test_info_timeout_leaves_session_usable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SYSTEMINFO_REQUEST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(system_info())
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_json(&server, "XML_SYSTEMINFO_REQUEST", system_info()).await;

    let client = EfaClient::connect(EfaConfig::new(server.uri()).with_timeout(1))
        .await
        .unwrap();

    match client.info().await {
        Err(EfaError::Transport(e)) => assert!(e.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }

    assert!(client.is_open().await);
    assert_eq!(client.info().await.unwrap().version, "10.6.14.22");
}

#[tokio::test]
async fn test_close_while_query_in_flight() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SYSTEMINFO_REQUEST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(system_info())
                .set_delay(Duration::from_millis(800)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;

    let (in_flight, after_close) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(client.info(), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            client.close().await;
            client.info().await
        })
    })
    .await
    .expect("query hung after close");

    // The running query keeps its connection and completes
    assert!(
        matches!(&in_flight, Ok(_) | Err(EfaError::Transport(_))),
        "unexpected result {in_flight:?}"
    );
    assert!(matches!(after_close, Err(EfaError::SessionState(_))));
    assert!(!client.is_open().await);
}

#[tokio::test]
async fn test_error_status_without_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SYSTEMINFO_REQUEST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = open_client(&server).await;

    match client.info().await {
        Err(EfaError::Transport(TransportError::Status { status, body })) => {
            assert_eq!(status, 503);
            assert!(body.is_empty());
        }
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(client.is_open().await);
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SYSTEMINFO_REQUEST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client.info().await.unwrap_err();

    match err {
        EfaError::Transport(TransportError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SYSTEMINFO_REQUEST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let err = client.info().await.unwrap_err();

    match err {
        EfaError::ResponseFormat { body, .. } => {
            assert_eq!(body.as_deref(), Some("<html>maintenance</html>"));
        }
        other => panic!("expected format error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_info() {
    let server = MockServer::start().await;
    mount_json(&server, "XML_SYSTEMINFO_REQUEST", system_info()).await;

    let client = open_client(&server).await;
    let info = client.info().await.unwrap();

    assert_eq!(info.version, "10.6.14.22");
    assert_eq!(info.data_format, "EFA10_06_01");
    assert_eq!(info.valid_from, NaiveDate::from_ymd_opt(2024, 11, 1).unwrap());
    assert_eq!(info.valid_to, NaiveDate::from_ymd_opt(2025, 12, 13).unwrap());
}

#[tokio::test]
async fn test_info_bad_date() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "XML_SYSTEMINFO_REQUEST",
        json!({
            "version": "10.6.14.22",
            "ptKernel": { "appVersion": "1", "dataFormat": "2", "dataBuild": "3" },
            "validity": { "from": "01.11.2024", "to": "2025-12-13" }
        }),
    )
    .await;

    let client = open_client(&server).await;
    let err = client.info().await.unwrap_err();

    assert!(matches!(
        err,
        EfaError::DateFormat {
            field: "validity.from",
            ..
        }
    ));
}

#[tokio::test]
async fn test_lines_by_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SERVINGLINES_REQUEST"))
        .and(query_param("mode", "line"))
        .and(query_param("lineName", "U1"))
        .and(query_param("mergeDir", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "10.6.14.22",
            "lines": [line("vgn:11001: :H:j25", "U1", 2, "Langwasser Süd")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let lines = client
        .lines_by_name("U1", &LineOptions::default().with_merged_directions(true))
        .await
        .unwrap();

    assert_eq!(lines.len(), 1);
    let u1 = &lines[0];
    assert_eq!(u1.id, "vgn:11001: :H:j25");
    assert_eq!(u1.name, "U1");
    assert_eq!(u1.product, TransportType::Subway);
    assert_eq!(
        u1.destination.as_ref().map(|d| d.name.as_str()),
        Some("Langwasser Süd")
    );
    assert_eq!(
        u1.operator.as_ref().and_then(|o| o.code.as_deref()),
        Some("VAG")
    );
    assert!(u1.origin.is_none());
}

#[tokio::test]
async fn test_lines_by_location_uses_stop_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_SERVINGLINES_REQUEST"))
        .and(query_param("mode", "odv"))
        .and(query_param("type_sl", "stopID"))
        .and(query_param("name_sl", "de:09564:704"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "10.6.14.22",
            "lines": [
                line("vgn:11001: :H:j25", "U1", 2, "Langwasser Süd"),
                line("vgn:31034: :H:j25", "34", 5, "Gustav-Adolf-Straße")
            ]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = open_client(&server).await;

    let by_id = client
        .lines_by_location("de:09564:704", &LineOptions::default())
        .await
        .unwrap();
    assert_eq!(by_id.len(), 2);
    assert_eq!(by_id[1].product, TransportType::Bus);

    let location = efa_client::efa::parse_location(&stop("de:09564:704", "Plärrer", 0)).unwrap();
    let by_location = client
        .lines_by_location(&location, &LineOptions::default())
        .await
        .unwrap();
    assert_eq!(by_location, by_id);
}

#[tokio::test]
async fn test_lines_by_location_rejects_non_stop() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "10.6.14.22",
            "lines": []
        })))
        .expect(0)
        .mount(&server)
        .await;

    let client = open_client(&server).await;

    let mut street = stop("streetID:1500000803::9564000:-1", "Fürther Straße", 0);
    street["type"] = json!("street");
    let street = efa_client::efa::parse_location(&street).unwrap();

    let result = client
        .lines_by_location(&street, &LineOptions::default())
        .await;
    assert!(matches!(result, Err(EfaError::InvalidArgument(_))));
}

fn stop_event(planned: &str, estimated: Option<&str>, number: &str) -> Value {
    let mut event = json!({
        "location": {
            "id": "de:09564:704:11:1",
            "isGlobalId": true,
            "name": "Plärrer",
            "type": "platform",
            "properties": { "stopId": "3000704", "platform": "1" }
        },
        "departureTimePlanned": planned,
        "transportation": line("vgn:11001: :H:j25", number, 2, "Langwasser Süd"),
        "isRealtimeControlled": estimated.is_some()
    });
    if let Some(estimated) = estimated {
        event["departureTimeEstimated"] = json!(estimated);
    }
    event
}

#[tokio::test]
async fn test_departures_by_location() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_DM_REQUEST"))
        .and(query_param("name_dm", "de:09564:704"))
        .and(query_param("type_dm", "stop"))
        .and(query_param("mode", "direct"))
        .and(query_param("useRealtime", "1"))
        .and(query_param("limit", "2"))
        .and(query_param("itdDate", "20241110"))
        .and(query_param("itdTime", "2216"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "10.6.14.22",
            "locations": [],
            "stopEvents": [
                stop_event("2024-11-10T21:16:00Z", Some("2024-11-10T21:18:00Z"), "U1"),
                stop_event("2024-11-10T21:20:00Z", None, "U11"),
                stop_event("2024-11-10T21:26:00Z", None, "U1")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let at = NaiveDateTime::parse_from_str("2024-11-10 22:16", "%Y-%m-%d %H:%M").unwrap();
    let departures = client
        .departures_by_location(
            "de:09564:704",
            &DepartureOptions::default().with_limit(2).with_time(at),
        )
        .await
        .unwrap();

    assert_eq!(departures.len(), 2);
    assert_eq!(departures[0].line.name, "U1");
    assert_eq!(departures[0].delay_minutes(), Some(2));
    assert!(departures[0].realtime);
    assert_eq!(departures[0].platform.as_deref(), Some("1"));
    assert_eq!(departures[1].line.name, "U11");
    assert_eq!(departures[1].estimated, None);
}

#[tokio::test]
async fn test_departures_none_scheduled() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "XML_DM_REQUEST",
        json!({ "version": "10.6.14.22", "locations": [] }),
    )
    .await;

    let client = open_client(&server).await;
    let departures = client
        .departures_by_location("de:09564:704", &DepartureOptions::default())
        .await
        .unwrap();

    assert!(departures.is_empty());
}

#[tokio::test]
async fn test_departures_bad_time() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "XML_DM_REQUEST",
        json!({
            "version": "10.6.14.22",
            "stopEvents": [stop_event("10.11.2024 21:16", None, "U1")]
        }),
    )
    .await;

    let client = open_client(&server).await;
    let err = client
        .departures_by_location("de:09564:704", &DepartureOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EfaError::DateFormat {
            field: "departureTimePlanned",
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_product_class_rejected() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "XML_SERVINGLINES_REQUEST",
        json!({
            "version": "10.6.14.22",
            "lines": [line("x", "X", 42, "Nowhere")]
        }),
    )
    .await;

    let client = open_client(&server).await;
    let err = client
        .lines_by_name("X", &LineOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, EfaError::UnknownEnumValue { .. }));
}

#[tokio::test]
async fn test_line_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_LINELIST_REQUEST"))
        .and(query_param("lineListSubnetwork", "vgn"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "10.6.14.22",
            "transportations": [
                {
                    "id": "vgn:11001: :H:j25",
                    "disassembledName": "U1",
                    "product": { "class": 2 }
                },
                {
                    "id": "vgn:20004: :H:j25",
                    "disassembledName": "4",
                    "product": { "class": 4 }
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let lines = client
        .line_list(Some("vgn"), &LineOptions::default())
        .await
        .unwrap();

    let names: Vec<&str> = lines.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["U1", "4"]);
    assert_eq!(lines[1].product, TransportType::Tram);
}

#[tokio::test]
async fn test_locations_by_line_keeps_route_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/XML_LINESTOP_REQUEST"))
        .and(query_param("line", "vgn:11001: :H:j25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": "10.6.14.22",
            "locationSequence": [
                stop("s1", "Fürth Hardhöhe", 0),
                stop("s2", "Plärrer", 900),
                stop("s3", "Langwasser Süd", 100)
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = open_client(&server).await;
    let stops = client
        .locations_by_line("vgn:11001: :H:j25")
        .await
        .unwrap();

    let ids: Vec<&str> = stops.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["s1", "s2", "s3"]);
}

#[tokio::test]
async fn test_concurrent_queries() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "XML_STOPFINDER_REQUEST",
        stop_finder(vec![stop("a", "A", 1)]),
    )
    .await;
    mount_json(
        &server,
        "XML_SERVINGLINES_REQUEST",
        json!({ "version": "1", "lines": [] }),
    )
    .await;

    let client = open_client(&server).await;
    let search = SearchOptions::default();
    let options = LineOptions::default();

    let (locations, lines) = tokio::join!(
        client.locations_by_name("A", &search),
        client.lines_by_name("U1", &options),
    );

    assert_eq!(locations.unwrap().len(), 1);
    assert!(lines.unwrap().is_empty());
}
