//! nodemap CLI - compile criteria and run finders against a node store.
//!
//! Entities are declared as JSON schema files in `--schema-dir`; nodes live
//! in the SQLite database given by `--db`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nodemap::config::PathsConfig;
use nodemap::{
    compile, Criteria, EntityType, Mapper, MetadataStore, Node, NodeLoader, NodeStore,
    Repository, SchemaProvider,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "nodemap")]
#[command(about = "Query a nodemap node store from the command line")]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Directory containing entity schema files
    #[arg(long, global = true, default_value = PathsConfig::DEFAULT_SCHEMA_DIR_NAME)]
    schema_dir: PathBuf,

    /// SQLite database holding the nodes
    #[arg(long, global = true, default_value = PathsConfig::DEFAULT_DATABASE_FILENAME)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the query compiled from criteria
    Compile {
        /// Criteria term as property=value, in query order
        #[arg(short, long = "criterion", value_parser = parse_pair, required = true)]
        criteria: Vec<(String, String)>,
    },
    /// Store a new node and print its id
    Put {
        entity: String,
        /// Property as name=value
        #[arg(short = 's', long = "set", value_parser = parse_pair)]
        properties: Vec<(String, String)>,
    },
    /// Load a node by id (find)
    Get { entity: String, id: i64 },
    /// List every node of an entity (findAll)
    All { entity: String },
    /// Run a dynamic finder such as findOneByTitle
    Call {
        entity: String,
        method: String,
        value: String,
    },
    /// Run findBy / findOneBy with explicit criteria
    Where {
        entity: String,
        #[arg(short, long = "criterion", value_parser = parse_pair, required = true)]
        criteria: Vec<(String, String)>,
        /// Return only the first match
        #[arg(long)]
        one: bool,
    },
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

struct Session {
    store: Arc<NodeStore>,
    mapper: Mapper,
}

impl Session {
    fn open(schema_dir: &Path, db: &Path) -> Result<Self> {
        let schemas = SchemaProvider::new(schema_dir)
            .with_context(|| format!("loading schemas from {}", schema_dir.display()))?;
        info!("Schemas: {}", schemas.entity_names().join(", "));

        let store = Arc::new(
            NodeStore::new(db).with_context(|| format!("opening node store {}", db.display()))?,
        );
        let mapper = Mapper::new(
            Arc::new(MetadataStore::new(Arc::new(schemas))),
            store.clone(),
            Arc::new(NodeLoader::new(store.clone())),
        );

        Ok(Self { store, mapper })
    }

    fn repository(&self, entity: &str) -> Result<Repository<Node>> {
        Ok(self
            .mapper
            .repository::<Node>(&EntityType::new::<Node>(entity))?)
    }

    fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::Compile { criteria } => print_compiled(criteria)?,
            Command::Put { entity, properties } => {
                let meta = self
                    .mapper
                    .metadata()
                    .resolve(&EntityType::new::<Node>(entity))?;
                let properties: BTreeMap<String, String> = properties.into_iter().collect();
                let id = self.store.insert(&meta, &properties)?;
                println!("{}", id);
            }
            Command::Get { entity, id } => {
                print_json(&self.repository(&entity)?.find(id)?)?;
            }
            Command::All { entity } => {
                print_json(&self.repository(&entity)?.find_all()?)?;
            }
            Command::Call {
                entity,
                method,
                value,
            } => {
                let nodes = self
                    .repository(&entity)?
                    .call(&method, &[value.as_str()])?
                    .into_many();
                print_json(&nodes)?;
            }
            Command::Where {
                entity,
                criteria,
                one,
            } => {
                let criteria: Criteria = criteria.into_iter().collect();
                let repo = self.repository(&entity)?;
                debug!("Running {}", repo.create_query(&criteria)?);
                if one {
                    print_json(&repo.find_one_by(&criteria)?)?;
                } else {
                    print_json(&repo.find_by(&criteria)?)?;
                }
            }
        }

        Ok(())
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_compiled(criteria: Vec<(String, String)>) -> Result<()> {
    let criteria: Criteria = criteria.into_iter().collect();
    println!("{}", compile(&criteria)?);
    Ok(())
}

fn run(args: Args) -> Result<()> {
    // Compiling criteria needs neither schemas nor a database.
    if let Command::Compile { criteria } = args.command {
        return print_compiled(criteria);
    }

    Session::open(&args.schema_dir, &args.db)?.execute(args.command)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("fullname=angus young").unwrap(),
            ("fullname".to_string(), "angus young".to_string())
        );
        assert_eq!(
            parse_pair("title=a=b").unwrap(),
            ("title".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "nodemap",
            "compile",
            "-c",
            "fullname=chris",
            "-c",
            "lastname=lord",
        ])
        .unwrap();
        match args.command {
            Command::Compile { criteria } => assert_eq!(criteria.len(), 2),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
