/// End-to-end estimates: config → catalog → both adapters → aggregation
mod common;

use common::*;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};
use workload_pricing::{
    config::{load_config_with_env, Config},
    error::AppError,
    estimator::Estimator,
    pricing::FleetSummary,
    workload::{parse_hours, ComputeType, PlatformPlan, Region, WorkloadRequest},
};

fn config_for(infrastructure: &MockServer, platform: &MockServer) -> Config {
    let env = HashMap::from([
        ("API_TOKEN".to_string(), TEST_TOKEN.to_string()),
        (
            "CALCULATOR__PRICING__INFRASTRUCTURE__BASE_URL".to_string(),
            infrastructure.uri(),
        ),
        (
            "CALCULATOR__PRICING__PLATFORM__PRICING_URL".to_string(),
            platform_url(platform),
        ),
    ]);
    load_config_with_env(None, env).unwrap()
}

fn request(instance: &str, count: u32, hours: &str) -> WorkloadRequest {
    WorkloadRequest::new(
        instance,
        count,
        parse_hours(hours).unwrap(),
        Region::UsEast1,
        PlatformPlan::Premium,
        ComputeType::JobsCompute,
    )
    .unwrap()
}

#[tokio::test]
async fn test_reference_estimate() {
    let infrastructure = setup_infrastructure_mock("m5d.8xlarge", "us-east-1", "0.50").await;
    let platform = setup_platform_mock(
        vec![price_list_row("m5d.8xlarge", "Jobs Compute", "Premium", "0.20")],
        None,
    )
    .await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let estimate = estimator.estimate(&request("m5d.8xlarge", 3, "10")).await.unwrap();

    let breakdown = &estimate.breakdown;
    assert_eq!(breakdown.infrastructure_subtotal(), dec!(15));
    assert_eq!(breakdown.platform_subtotal(), dec!(6));
    assert_eq!(breakdown.grand_total(), dec!(21.00));
    assert!(breakdown.warnings().is_empty());
    assert_eq!(estimate.instance.vcpu, 32);
}

#[tokio::test]
async fn test_platform_outage_gives_partial_estimate() {
    let infrastructure = setup_infrastructure_mock("r5.2xlarge", "us-east-1", "0.504").await;
    let platform = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pricing/AWS.json"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&platform)
        .await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let estimate = estimator.estimate(&request("r5.2xlarge", 2, "2.5")).await.unwrap();

    let breakdown = &estimate.breakdown;
    assert_eq!(breakdown.infrastructure_subtotal(), dec!(2.52));
    assert_eq!(breakdown.platform_subtotal(), dec!(0));
    assert_eq!(breakdown.grand_total(), dec!(2.52));
    assert_eq!(breakdown.warnings().len(), 1);
    assert!(breakdown
        .warnings()
        .iter()
        .all(|w| w.starts_with("platform price unavailable")));
}

#[tokio::test]
async fn test_both_sources_down_is_no_pricing_data() {
    let infrastructure = MockServer::start().await;
    let platform = MockServer::start().await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let err = estimator.estimate(&request("m5.xlarge", 1, "1")).await.unwrap_err();

    assert!(matches!(err, AppError::NoPricingData(_)));
}

#[tokio::test]
async fn test_unknown_instance_makes_no_requests() {
    let infrastructure = MockServer::start().await;
    let platform = MockServer::start().await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let err = estimator.estimate(&request("m5.nonexistent", 1, "1")).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(infrastructure.received_requests().await.unwrap().is_empty());
    assert!(platform.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fleet_of_estimates() {
    let infrastructure = MockServer::start().await;
    mount_product(&infrastructure, "m5.xlarge").await;
    mount_price(&infrastructure, "m5.xlarge", "us-east-1", "0.192").await;
    mount_product(&infrastructure, "r5.2xlarge").await;
    mount_price(&infrastructure, "r5.2xlarge", "us-east-1", "0.504").await;
    let platform = setup_platform_mock(
        vec![
            price_list_row("m5.xlarge", "Jobs Compute", "Premium", "0.10"),
            price_list_row("r5.2xlarge", "Jobs Compute", "Premium", "0.30"),
        ],
        None,
    )
    .await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let driver = estimator.estimate(&request("m5.xlarge", 1, "8")).await.unwrap();
    let workers = estimator.estimate(&request("r5.2xlarge", 4, "8")).await.unwrap();

    let summary = FleetSummary::from_breakdowns(&[driver.breakdown, workers.breakdown]).unwrap();

    assert_eq!(summary.estimates, 2);
    assert_eq!(summary.total_instances, 5);
    assert_eq!(summary.instance_hours, dec!(40));
    // 8 × 0.192 + 32 × 0.504
    assert_eq!(summary.infrastructure_total, dec!(17.664));
    // 8 × 0.10 + 32 × 0.30
    assert_eq!(summary.platform_total, dec!(10.4));
    assert_eq!(summary.grand_total, dec!(28.06));
    // 0.192 + 4 × 0.504 and 0.10 + 4 × 0.30
    assert_eq!(summary.infrastructure_cost_per_hour, dec!(2.208));
    assert_eq!(summary.platform_cost_per_hour, dec!(1.30));
    assert_eq!(summary.total_cost_per_hour, dec!(3.508));
}

#[tokio::test]
async fn test_fleet_run_reports_unpriced_instance_and_keeps_the_rest() {
    let infrastructure = MockServer::start().await;
    mount_product(&infrastructure, "m5.xlarge").await;
    mount_price(&infrastructure, "m5.xlarge", "us-east-1", "0.192").await;
    // Neither upstream knows r5.2xlarge
    let platform = setup_platform_mock(
        vec![price_list_row("m5.xlarge", "Jobs Compute", "Premium", "0.10")],
        None,
    )
    .await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let fleet = estimator
        .estimate_fleet(&[request("r5.2xlarge", 2, "8"), request("m5.xlarge", 3, "8")])
        .await
        .unwrap();

    assert_eq!(fleet.estimates.len(), 1);
    assert_eq!(fleet.estimates[0].breakdown.grand_total(), dec!(7.01));
    assert_eq!(fleet.failures.len(), 1);
    assert_eq!(fleet.failures[0].instance_type, "r5.2xlarge");
    assert!(matches!(fleet.failures[0].error, AppError::NoPricingData(_)));

    let summary = fleet.summary().unwrap();
    assert_eq!(summary.total_instances, 3);
    assert_eq!(summary.total_cost_per_hour, dec!(0.876));
}

#[tokio::test]
async fn test_fleet_run_with_unknown_instance_makes_no_requests() {
    let infrastructure = MockServer::start().await;
    let platform = MockServer::start().await;

    let estimator = Estimator::from_config(&config_for(&infrastructure, &platform)).unwrap();
    let err = estimator
        .estimate_fleet(&[request("m5.xlarge", 1, "1"), request("m5.nonexistent", 1, "1")])
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(infrastructure.received_requests().await.unwrap().is_empty());
    assert!(platform.received_requests().await.unwrap().is_empty());
}
