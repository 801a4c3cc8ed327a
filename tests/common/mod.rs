//! Shared mock upstreams for integration tests
#![allow(dead_code)]

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

pub const TEST_TOKEN: &str = "vntg_tkn_test_0123456789";

pub fn product_id(instance_type: &str) -> String {
    format!("aws-ec2-{}", instance_type.replace('.', "_"))
}

pub fn price_path(instance_type: &str, region: &str) -> String {
    let product = product_id(instance_type);
    format!(
        "/v2/products/{}/prices/{}-{}-on_demand-linux",
        product,
        product,
        region.replace('-', "_")
    )
}

/// Mount the product lookup for `instance_type`
pub async fn mount_product(server: &MockServer, instance_type: &str) {
    Mock::given(method("GET"))
        .and(path("/v2/products"))
        .and(query_param("name", instance_type))
        .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [{ "id": product_id(instance_type), "name": instance_type }]
        })))
        .mount(server)
        .await;
}

/// Mount the hourly on-demand price for `instance_type` in `region`
pub async fn mount_price(server: &MockServer, instance_type: &str, region: &str, amount: &str) {
    Mock::given(method("GET"))
        .and(path(price_path(instance_type, region)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": format!("{}-{}-on_demand-linux", product_id(instance_type), region.replace('-', "_")),
            "amount": amount,
            "unit": "hour",
            "currency": "USD"
        })))
        .mount(server)
        .await;
}

/// Infrastructure API that knows a single instance type
pub async fn setup_infrastructure_mock(instance_type: &str, region: &str, amount: &str) -> MockServer {
    let server = MockServer::start().await;
    mount_product(&server, instance_type).await;
    mount_price(&server, instance_type, region, amount).await;
    server
}

pub fn price_list_row(instance: &str, compute: &str, plan: &str, hourrate: &str) -> Value {
    json!({
        "instance": instance,
        "compute": compute,
        "plan": plan,
        "hourrate": hourrate
    })
}

/// Platform price list served at `/pricing/AWS.json`
pub async fn setup_platform_mock(rows: Vec<Value>, delay: Option<Duration>) -> MockServer {
    let server = MockServer::start().await;
    let mut response = ResponseTemplate::new(200).set_body_json(Value::Array(rows));
    if let Some(delay) = delay {
        response = response.set_delay(delay);
    }
    Mock::given(method("GET"))
        .and(path("/pricing/AWS.json"))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

pub fn platform_url(server: &MockServer) -> String {
    format!("{}/pricing/AWS.json", server.uri())
}
