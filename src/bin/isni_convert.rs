use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use isni_convert_rs::config::{ConfigOverrides, ConverterConfig};
use isni_convert_rs::{
    Converter, DateWindow, IdentityTypeFilter, NoResources, NormalizedRecord, Resource,
    ResourceLookup, Scope, WindowBasis,
};
use serde::Serialize;
use time::macros::format_description;
use time::Date;
use tracing_subscriber::EnvFilter;

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn parse_arg_any(flags: &[&str]) -> Option<String> {
    flags.iter().find_map(|flag| parse_arg(flag))
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn print_help() {
    eprintln!(
        r#"isni_convert - convert authority records into registry identities

USAGE:
    isni_convert --records <FILE> [OPTIONS]

OPTIONS:
    -c, --config <FILE>         Path to config file (TOML)
    -r, --records <FILE>        Normalized records (JSON array)
        --resources <FILE>      Resources keyed by record identifier (JSON object)
        --requested <FILE>      Identifiers to convert, one per line
        --window <BASIS>        Date window basis: created | modified
        --from <DATE>           Window start, inclusive (YYYY-MM-DD)
        --until <DATE>          Window end, exclusive (YYYY-MM-DD)
        --max-resources <N>     Override maximum resources per identity
        --identity-types <T>    persons | organisations | both
    -o, --output <FILE>         Write output here instead of stdout
    -h, --help                  Print help

ENVIRONMENT:
    ISNI_CONVERT_MAX_RESOURCES                  Maximum resources per identity
    ISNI_CONVERT_IDENTITY_TYPES                 persons | organisations | both
    ISNI_CONVERT_VOCABULARY__PERSON_RELATIONS   Person relation vocabulary file
    ISNI_CONVERT_VOCABULARY__ORGANISATION_RELATIONS
                                                Organisation relation vocabulary file
    RUST_LOG                                    Log filter [default: info]
"#
    );
}

fn parse_date(value: &str) -> anyhow::Result<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(value, format).with_context(|| format!("invalid date {value:?}"))
}

fn parse_identity_types(value: &str) -> anyhow::Result<IdentityTypeFilter> {
    match value {
        "persons" => Ok(IdentityTypeFilter::Persons),
        "organisations" => Ok(IdentityTypeFilter::Organisations),
        "both" => Ok(IdentityTypeFilter::Both),
        other => anyhow::bail!("unknown identity type filter {other:?}"),
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let value =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

fn load_scope() -> anyhow::Result<Scope> {
    let mut scope = Scope::all();
    if let Some(path) = parse_arg("--requested") {
        let raw = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        let requested: BTreeSet<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        scope.requested = Some(requested);
    }

    if let Some(basis) = parse_arg("--window") {
        let basis = match basis.as_str() {
            "created" => WindowBasis::Created,
            "modified" => WindowBasis::Modified,
            other => anyhow::bail!("unknown window basis {other:?}"),
        };
        let from = parse_arg("--from")
            .context("--window requires --from")
            .and_then(|value| parse_date(&value))?;
        let until = parse_arg("--until")
            .map(|value| parse_date(&value))
            .transpose()?;
        scope = scope.with_window(DateWindow::new(basis, from, until)?);
    }
    Ok(scope)
}

#[derive(Serialize)]
struct Output<'a> {
    summary: &'a isni_convert_rs::ConversionSummary,
    identities: &'a isni_convert_rs::IdentityMap,
    cross_references: &'a BTreeMap<String, BTreeSet<String>>,
}

fn main() -> anyhow::Result<()> {
    if has_flag("-h") || has_flag("--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = parse_arg_any(&["-c", "--config"]);
    let overrides = ConfigOverrides {
        max_resources: parse_arg("--max-resources")
            .map(|value| value.parse::<usize>())
            .transpose()
            .context("--max-resources must be a positive integer")?,
        identity_types: parse_arg("--identity-types")
            .map(|value| parse_identity_types(&value))
            .transpose()?,
        vocabulary: None,
    };
    let config = ConverterConfig::load(config_path.as_deref(), overrides)?;
    let converter = Converter::new(config)?;

    let records_path = parse_arg_any(&["-r", "--records"]).context("--records is required")?;
    let records: Vec<NormalizedRecord> = load_json(Path::new(&records_path))?;
    let resources: Option<BTreeMap<String, Vec<Resource>>> = parse_arg("--resources")
        .map(|path| load_json(Path::new(&path)))
        .transpose()?;
    let lookup: &dyn ResourceLookup = match &resources {
        Some(resources) => resources,
        None => &NoResources,
    };

    let scope = load_scope()?;
    let conversion = converter.convert(records, &scope, lookup)?;

    let output = Output {
        summary: &conversion.summary,
        identities: &conversion.identities,
        cross_references: &conversion.cross_references,
    };
    let json = serde_json::to_string_pretty(&output)?;
    match parse_arg_any(&["-o", "--output"]) {
        Some(path) => fs::write(&path, json).with_context(|| format!("writing {path}"))?,
        None => println!("{json}"),
    }

    Ok(())
}
