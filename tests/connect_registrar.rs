//! Kafka Connect registration against a mocked REST runtime.

use httpmock::prelude::*;
use serde_json::json;
use wp_topic_provision::ProvisionError;
use wp_topic_provision::connect::{
    ConnectorConfig, ConnectorRegistrar, RegistrationOutcome, RegistrationState,
};

fn stations_config() -> ConnectorConfig {
    ConnectorConfig {
        connection_url: "jdbc:postgresql://postgres:5432/cta".into(),
        connection_password: "chicago".into(),
        ..ConnectorConfig::default()
    }
}

fn expected_create_body() -> serde_json::Value {
    json!({
        "name": "stations",
        "config": {
            "connector.class": "io.confluent.connect.jdbc.JdbcSourceConnector",
            "key.converter": "org.apache.kafka.connect.json.JsonConverter",
            "key.converter.schemas.enable": "false",
            "value.converter": "org.apache.kafka.connect.json.JsonConverter",
            "value.converter.schemas.enable": "false",
            "batch.max.rows": "500",
            "connection.url": "jdbc:postgresql://postgres:5432/cta",
            "connection.user": "cta_admin",
            "connection.password": "chicago",
            "table.whitelist": "stations",
            "mode": "incrementing",
            "incrementing.column.name": "stop_id",
            "topic.prefix": "producer-connector-",
            "poll.interval.ms": "15000"
        }
    })
}

#[tokio::test]
async fn registered_connector_is_not_posted_again() {
    let server = MockServer::start_async().await;
    let lookup = server
        .mock_async(|when, then| {
            when.method(GET).path("/connectors/stations");
            then.status(200).json_body(json!({"name": "stations"}));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/connectors");
            then.status(201);
        })
        .await;

    let registrar = ConnectorRegistrar::with_client(&server.base_url(), reqwest::Client::new());
    let outcome = registrar
        .ensure_connector_registered(&stations_config())
        .await
        .expect("lookup short-circuits");

    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    assert_eq!(registrar.state("stations").await, RegistrationState::Registered);
    lookup.assert_hits_async(1).await;
    create.assert_hits_async(0).await;
}

#[tokio::test]
async fn missing_connector_is_created_once() {
    let server = MockServer::start_async().await;
    let mut missing = server
        .mock_async(|when, then| {
            when.method(GET).path("/connectors/stations");
            then.status(404)
                .json_body(json!({"error_code": 404, "message": "Connector stations not found"}));
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/connectors")
                .header("content-type", "application/json")
                .json_body(expected_create_body());
            then.status(201).json_body(expected_create_body());
        })
        .await;

    let registrar = ConnectorRegistrar::with_client(&server.base_url(), reqwest::Client::new());
    assert_eq!(
        registrar.state("stations").await,
        RegistrationState::Unregistered
    );
    let outcome = registrar
        .ensure_connector_registered(&stations_config())
        .await
        .expect("created");
    assert_eq!(outcome, RegistrationOutcome::Created);
    assert_eq!(registrar.state("stations").await, RegistrationState::Registered);
    missing.assert_hits_async(1).await;
    create.assert_hits_async(1).await;

    // the runtime now knows the connector
    missing.delete_async().await;
    let found = server
        .mock_async(|when, then| {
            when.method(GET).path("/connectors/stations");
            then.status(200).json_body(json!({"name": "stations"}));
        })
        .await;

    let outcome = registrar
        .ensure_connector_registered(&stations_config())
        .await
        .expect("second call short-circuits");
    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    found.assert_hits_async(1).await;
    create.assert_hits_async(1).await;
}

#[tokio::test]
async fn conflict_on_create_counts_as_registered() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/connectors/stations");
            then.status(404);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/connectors");
            then.status(409)
                .json_body(json!({"error_code": 409, "message": "Connector stations already exists"}));
        })
        .await;

    let registrar = ConnectorRegistrar::with_client(&server.base_url(), reqwest::Client::new());
    let outcome = registrar
        .ensure_connector_registered(&stations_config())
        .await
        .expect("409 is not fatal");
    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    assert_eq!(registrar.state("stations").await, RegistrationState::Registered);
}

#[tokio::test]
async fn rejected_create_is_fatal() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/connectors/stations");
            then.status(404);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/connectors");
            then.status(500).body("Failed to find any class that implements Connector");
        })
        .await;

    let registrar = ConnectorRegistrar::with_client(&server.base_url(), reqwest::Client::new());
    let err = registrar
        .ensure_connector_registered(&stations_config())
        .await
        .expect_err("runtime rejects the connector");
    match err {
        ProvisionError::ConnectorRegistrationFailed { name, status, body } => {
            assert_eq!(name, "stations");
            assert_eq!(status.as_u16(), 500);
            assert!(body.contains("Connector"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        registrar.state("stations").await,
        RegistrationState::Unregistered
    );
}

#[tokio::test]
async fn server_error_on_lookup_still_attempts_creation() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/connectors/stations");
            then.status(503);
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/connectors");
            then.status(201);
        })
        .await;

    let registrar = ConnectorRegistrar::with_client(&server.base_url(), reqwest::Client::new());
    let outcome = registrar
        .ensure_connector_registered(&stations_config())
        .await
        .expect("created");
    assert_eq!(outcome, RegistrationOutcome::Created);
    create.assert_hits_async(1).await;
}
