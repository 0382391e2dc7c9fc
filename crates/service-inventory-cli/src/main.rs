//! # Service Inventory CLI
//!
//! Command-line access to a service inventory: record, list, inspect,
//! update and remove component dependencies.

use anyhow::{bail, Context, Result};
use service_inventory_client::{
    run_lifecycle, ServiceInventoryClient, ServiceInventoryConfig, ServiceQuery, ServiceRecord,
    ServiceSpec, ServiceState,
};
use std::env;
use tracing_subscriber::EnvFilter;

const CREATE_USAGE: &str =
    "Usage: service-inventory create <component> <dependency> <url> <specification> [state]";
const UPDATE_USAGE: &str =
    "Usage: service-inventory update <id> <component> <dependency> <url> <specification> <state>";
const DELETE_USAGE: &str = "Usage: service-inventory delete <id> [--ignore-not-found]";
const LIFECYCLE_USAGE: &str =
    "Usage: service-inventory lifecycle [<component> <dependency> <url> <specification>]";

const LIFECYCLE_DEFAULTS: [&str; 4] = [
    "alice-pc-consumer",
    "upstreamproductcatalog",
    "http://components.example.org/alice-productcatalogmanagement/tmf-api/productCatalogManagement/v4",
    "https://raw.githubusercontent.com/tmforum-apis/TMF620_ProductCatalog/master/TMF620-ProductCatalog-v4.0.0.swagger.json",
];

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut config = ServiceInventoryConfig::from_env();
    if let Some(endpoint) = take_option(&mut args, "--endpoint")? {
        config.endpoint = endpoint;
    }

    if args.is_empty() {
        print_help();
        return Ok(());
    }
    let mut rest = args.split_off(1);
    let command = args.remove(0);

    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_help();
        return Ok(());
    }

    let client = ServiceInventoryClient::new(config).context("Failed to create client")?;
    tracing::debug!(endpoint = client.endpoint(), command, "Running command");

    match command.as_str() {
        "create" => {
            let spec = parse_spec(&rest, ServiceState::Active).context(CREATE_USAGE)?;
            let record = client.create_service(&spec).await?;
            print_record(&record)?;
        }
        "list" => {
            let query = parse_query(&mut rest)?;
            let records = client.list_services(&query).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        "get" => {
            let id = single_arg(&rest, "Usage: service-inventory get <id>")?;
            let record = client.get_service(&id).await?;
            print_record(&record)?;
        }
        "update" => {
            if rest.len() != 6 {
                bail!(UPDATE_USAGE);
            }
            let id = rest.remove(0);
            let spec = parse_spec(&rest, ServiceState::Active)?;
            let record = client.update_service(&id, &spec).await?;
            print_record(&record)?;
        }
        "delete" => {
            let ignore_not_found = take_flag(&mut rest, "--ignore-not-found");
            let id = single_arg(&rest, DELETE_USAGE)?;
            let deleted = client.delete_service(&id, ignore_not_found).await?;
            if deleted {
                println!("deleted {id}");
            } else {
                println!("not deleted {id} (treated as absent)");
            }
        }
        "lifecycle" => {
            let spec = lifecycle_spec(&rest).context(LIFECYCLE_USAGE)?;
            let report = run_lifecycle(&client, &spec).await?;
            print_record(&report.fetched)?;
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_record(record: &ServiceRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

/// Remove `--name <value>` from `args`, returning the value.
fn take_option(args: &mut Vec<String>, name: &str) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("{name} requires a value");
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(value))
}

/// Remove `flag` from `args`, returning whether it was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

fn single_arg(args: &[String], usage: &str) -> Result<String> {
    match args {
        [one] => Ok(one.clone()),
        _ => bail!("{usage}"),
    }
}

fn parse_state(raw: &str) -> Result<ServiceState> {
    raw.parse::<ServiceState>().context("Invalid state")
}

fn parse_spec(args: &[String], default_state: ServiceState) -> Result<ServiceSpec> {
    let state = match args {
        [_, _, _, _] => default_state,
        [_, _, _, _, state] => parse_state(state)?,
        _ => bail!("expected <component> <dependency> <url> <specification> [state]"),
    };
    Ok(ServiceSpec::new(
        args[0].as_str(),
        args[1].as_str(),
        args[2].as_str(),
        args[3].as_str(),
        state,
    ))
}

fn lifecycle_spec(args: &[String]) -> Result<ServiceSpec> {
    if args.is_empty() {
        let defaults: Vec<String> = LIFECYCLE_DEFAULTS.iter().map(ToString::to_string).collect();
        return parse_spec(&defaults, ServiceState::Inactive);
    }
    parse_spec(args, ServiceState::Inactive)
}

fn parse_query(args: &mut Vec<String>) -> Result<ServiceQuery> {
    let mut query = if take_flag(args, "--all") {
        ServiceQuery::all_states()
    } else {
        ServiceQuery::default()
    };
    if let Some(state) = take_option(args, "--state")? {
        query = query.state(Some(parse_state(&state)?));
    }
    if let Some(component) = take_option(args, "--component")? {
        query = query.component(component);
    }
    if let Some(dependency) = take_option(args, "--dependency")? {
        query = query.dependency(dependency);
    }
    if let Some(extra) = args.first() {
        bail!("Unexpected argument: {extra}");
    }
    Ok(query)
}

fn print_help() {
    println!(
        r#"Service Inventory CLI

USAGE:
    service-inventory [--endpoint <url>] <COMMAND> [OPTIONS]

COMMANDS:
    create <component> <dependency> <url> <specification> [state]
                      Record a dependency (state defaults to active)
    list [--component <c>] [--dependency <d>] [--state <s> | --all]
                      List dependencies (active only unless --all)
    get <id>          Show a single dependency
    update <id> <component> <dependency> <url> <specification> <state>
                      Replace all fields of a dependency
    delete <id> [--ignore-not-found]
                      Remove a dependency
    lifecycle [<component> <dependency> <url> <specification>]
                      Create, update and delete a throwaway record
    help              Show this help message

ENVIRONMENT:
    SERVICE_INVENTORY_URL   API endpoint (overridden by --endpoint)
    RUST_LOG                Log filter (default: info)

EXAMPLES:
    service-inventory list --component acme-productinventory
    service-inventory delete 5406c1d2-8df8-4e35-bdfc-73548b8bffac --ignore-not-found
"#
    );
}
