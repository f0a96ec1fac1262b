//! Dry-run audit demonstrating both scanner variants against in-memory APIs.
//!
//! This example shows how to:
//! - Load a policy document and resolve it per provider
//! - Run the paginated (AWS Config) and streaming (Cloud Asset) scanners
//! - Write the CSV report and archive, and print the chat messages
//!
//! Run with: cargo run --example dry_run_audit

use tagwarden::backends::gcp::ResourceSearchResult;
use tagwarden::backends::{
    AssetInventoryScanner, ConfigServiceScanner, MockAssetInventory, MockConfigService,
};
use tagwarden::notify::{RecordingNotifier, SentItem};
use tagwarden::prelude::*;

use std::sync::Arc;

const POLICY: &str = r#"
included-resources: [AWS::EC2::Instance, AWS::S3::Bucket]
excluded-resources: [compute.googleapis.com/Disk]
required-labels: [env, owner]
banned-labels: [temp]
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let document = PolicyDocument::from_yaml_str(POLICY)?;
    let output_root = std::env::temp_dir().join("tagwarden-demo");

    println!("=== AWS Config (paginated) ===\n");

    let config_service = MockConfigService::new()
        .with_page("AWS::EC2::Instance", &["i-0a1", "i-0b2"])
        .with_page("AWS::EC2::Instance", &["i-0c3"])
        .with_page("AWS::S3::Bucket", &["logs"])
        .with_configuration(
            "AWS::EC2::Instance",
            "i-0a1",
            Some("arn:aws:ec2:ap-northeast-1:123456789012:instance/i-0a1"),
            r#"{"tags": [{"key": "env", "value": "prod"}, {"key": "owner", "value": "web"}]}"#,
        )
        .with_configuration(
            "AWS::EC2::Instance",
            "i-0b2",
            Some("arn:aws:ec2:ap-northeast-1:123456789012:instance/i-0b2"),
            r#"{"tags": [{"key": "env", "value": "dev"}]}"#,
        )
        .with_configuration(
            "AWS::EC2::Instance",
            "i-0c3",
            Some("arn:aws:ec2:ap-northeast-1:123456789012:instance/i-0c3"),
            r#"{"tags": []}"#,
        )
        .with_configuration(
            "AWS::S3::Bucket",
            "logs",
            Some("arn:aws:s3:::logs"),
            r#"{"tags": [{"key": "env", "value": "prod"}, {"key": "owner", "value": "ops"}, {"key": "temp", "value": "1"}]}"#,
        )
        .with_list_failures(2);

    let scanner = ConfigServiceScanner::new(
        config_service,
        ResourcePolicy::for_provider(&document, Provider::Aws)?,
    )
    .with_retry(RetryConfig::immediate());

    run(scanner, "demo-account", output_root.join("aws")).await?;

    println!("\n=== Cloud Asset Inventory (streaming) ===\n");

    let asset_inventory = MockAssetInventory::new()
        .with_page(vec![
            ResourceSearchResult::new("compute.googleapis.com/Instance", "vm-web-1")
                .with_label("env", "prod")
                .with_label("owner", "web"),
            ResourceSearchResult::new("compute.googleapis.com/Disk", "disk-1"),
        ])
        .with_page(vec![
            ResourceSearchResult::new("storage.googleapis.com/Bucket", "scratch")
                .with_label("temp", "true"),
        ]);

    let scanner = AssetInventoryScanner::new(
        asset_inventory,
        ResourcePolicy::for_provider(&document, Provider::Gcp)?,
    );

    run(scanner, "demo-project", output_root.join("gcp")).await?;

    println!("\n=== Example Complete ===");
    Ok(())
}

async fn run<S: ResourceScanner + 'static>(
    scanner: S,
    scope: &str,
    output_dir: std::path::PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let notifier = Arc::new(RecordingNotifier::new());

    let auditor = LabelAuditor::builder()
        .with_scanner(scanner)
        .with_arc_notifier(notifier.clone())
        .with_config(AuditorConfig::new().with_output_dir(output_dir))
        .build()?;

    let report = auditor.run(&ScanContext::new(scope)).await?;

    println!("Run ID: {}", report.run_id);
    println!("Missing required labels: {}", report.missing_required_count());
    println!("Carrying banned labels: {}", report.banned_count());
    println!("Archive: {:?}", report.archive_path);

    for item in notifier.sent() {
        match item {
            SentItem::Message { text, thread_ts } => {
                println!("\n--- message (thread: {:?}) ---\n{}", thread_ts, text);
            }
            SentItem::File { path, title, .. } => {
                println!("\n--- file \"{}\": {} ---", title, path.display());
            }
        }
    }

    Ok(())
}
