//! PageTools CLI
//!
//! Manage saved replacement rules and permitted domains, run replacements over
//! local HTML files, and list the links of a page.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pt_core::message::ReplaceOutcome;
use pt_core::url::clean_domain_input;
use pt_core::{Dispatcher, Request, Response, RuleDraft};

mod extract;
mod file_store;
mod page;

use extract::{HttpSource, Strategy};
use file_store::JsonFileBackend;

#[derive(Parser)]
#[command(name = "pt-cli")]
#[command(about = "PageTools text replacer and link extractor")]
struct Cli {
    /// Store file holding rules and permitted domains
    #[arg(long, global = true, env = "PAGETOOLS_STORE", default_value = "pagetools.json")]
    store: PathBuf,

    /// Debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage saved replacement rules
    Rules {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Manage domains permitted for link extraction
    Domains {
        #[command(subcommand)]
        action: DomainAction,
    },

    /// Run one find/replace over an HTML file
    Replace {
        /// Input HTML file
        #[arg(short, long)]
        input: PathBuf,

        /// Tag name, optionally `tag;attribute`
        #[arg(short, long)]
        tag: String,

        /// Text or regular expression to find
        #[arg(short, long)]
        find: String,

        /// Replacement text
        #[arg(short, long, default_value = "")]
        replace: String,

        /// Match the find text literally
        #[arg(long)]
        literal: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply every saved rule for a host to an HTML file
    Apply {
        /// Input HTML file
        #[arg(short, long)]
        input: PathBuf,

        /// Hostname the page was served from
        #[arg(long)]
        host: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the http(s) links of a page
    Extract {
        /// Page to fetch; its domain must be permitted
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,

        /// Local HTML file to scan
        #[arg(long)]
        file: Option<PathBuf>,

        /// Extraction strategy
        #[arg(long, value_enum, default_value = "parser")]
        strategy: Strategy,

        /// Print `{links, sourceUrl}` as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RuleAction {
    /// List saved rules
    List,

    /// Save a new rule
    Add {
        /// Tag name, optionally `tag;attribute`
        #[arg(short, long)]
        tag: String,

        /// Text or regular expression to find
        #[arg(short, long)]
        find: String,

        /// Replacement text
        #[arg(short, long, default_value = "")]
        replace: String,

        /// Domain the rule is limited to (all sites if empty)
        #[arg(short, long, default_value = "")]
        domain: String,

        /// Match the find text literally
        #[arg(long)]
        literal: bool,
    },

    /// Enable or disable a rule
    Toggle { id: String },

    /// Delete a rule
    Delete { id: String },
}

#[derive(Subcommand)]
enum DomainAction {
    /// List permitted domains
    List,

    /// Permit a domain (and its subdomains)
    Add { domain: String },

    /// Remove a permitted domain
    Remove { domain: String },

    /// Check whether a host or URL is permitted
    Check { host: String },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Rules { action } => cmd_rules(&mut open_dispatcher(&cli.store, Strategy::Parser)?, action),
        Commands::Domains { action } => cmd_domains(&mut open_dispatcher(&cli.store, Strategy::Parser)?, action),
        Commands::Replace {
            input,
            tag,
            find,
            replace,
            literal,
            output,
        } => {
            let mut dispatcher = open_dispatcher(&cli.store, Strategy::Parser)?;
            cmd_replace(&mut dispatcher, &input, tag, find, replace, literal, output.as_deref())
        }
        Commands::Apply { input, host, output } => {
            let mut dispatcher = open_dispatcher(&cli.store, Strategy::Parser)?;
            cmd_apply(&mut dispatcher, &input, &host, output.as_deref())
        }
        Commands::Extract {
            url,
            file,
            strategy,
            json,
        } => match (url, file) {
            (_, Some(file)) => extract::extract_file(&file, strategy, json),
            (Some(url), None) => {
                let mut dispatcher = open_dispatcher(&cli.store, strategy)?;
                extract::extract_url(&mut dispatcher, &url, json)
            }
            (None, None) => Err("Either --url or --file is required".to_string()),
        },
    }
}

type CliDispatcher = Dispatcher<JsonFileBackend, HttpSource>;

fn open_dispatcher(store: &Path, strategy: Strategy) -> Result<CliDispatcher, String> {
    let backend = JsonFileBackend::open(store).map_err(|e| e.to_string())?;
    log::debug!("Using store {}", backend.path().display());
    let source = extract::http_source(strategy)?;
    Ok(Dispatcher::new(backend, source))
}

/// Turn failure responses into errors.
pub(crate) fn check(response: Response) -> Result<Response, String> {
    match response {
        Response::Failure { message, .. } => Err(message),
        Response::Error { error, .. } => Err(error),
        Response::Replaced(ReplaceOutcome {
            success: false, message, ..
        }) => Err(message.unwrap_or_else(|| "Replacement failed".to_string())),
        other => Ok(other),
    }
}

fn dispatch(dispatcher: &mut CliDispatcher, request: Request) -> Result<Response, String> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create runtime: {}", e))?;
    check(runtime.block_on(dispatcher.handle_detached(request)))
}

fn cmd_rules(dispatcher: &mut CliDispatcher, action: RuleAction) -> Result<(), String> {
    match action {
        RuleAction::List => {
            let rules = dispatcher.rules().list().map_err(|e| e.to_string())?;
            if rules.is_empty() {
                println!("No saved rules");
            }
            for rule in rules {
                println!(
                    "[{}] {}  <{}> {:?} -> {:?}  ({}{})",
                    if rule.enabled { "x" } else { " " },
                    rule.id,
                    rule.tag_selector,
                    rule.find_pattern,
                    rule.replacement,
                    if rule.domain.is_empty() { "all sites" } else { rule.domain.as_str() },
                    if rule.use_regex { "" } else { ", literal" },
                );
            }
            Ok(())
        }
        RuleAction::Add {
            tag,
            find,
            replace,
            domain,
            literal,
        } => {
            let mut draft = RuleDraft::new(&tag, &find, &replace, &domain);
            draft.use_regex = !literal;
            if let Response::RuleSaved { rule, .. } = dispatch(dispatcher, Request::SaveRule { rule: draft })? {
                println!("Saved rule {}", rule.id);
            }
            Ok(())
        }
        RuleAction::Toggle { id } => {
            if let Response::RuleToggled { id, enabled, .. } = dispatch(dispatcher, Request::ToggleRule { id })? {
                println!("Rule {} {}", id, if enabled { "enabled" } else { "disabled" });
            }
            Ok(())
        }
        RuleAction::Delete { id } => {
            dispatch(dispatcher, Request::DeleteRule { id: id.clone() })?;
            println!("Deleted rule {}", id);
            Ok(())
        }
    }
}

fn cmd_domains(dispatcher: &mut CliDispatcher, action: DomainAction) -> Result<(), String> {
    match action {
        DomainAction::List => {
            let domains = dispatcher.domains().list().map_err(|e| e.to_string())?;
            if domains.is_empty() {
                println!("No permitted domains");
            }
            for domain in domains {
                println!("{}", domain);
            }
            Ok(())
        }
        DomainAction::Add { domain } => {
            if let Response::DomainAdded { status, domain } = dispatch(dispatcher, Request::AddDomain { domain })? {
                println!("{} ({:?})", domain, status);
            }
            Ok(())
        }
        DomainAction::Remove { domain } => {
            if let Response::DomainRemoved { removed, domain } =
                dispatch(dispatcher, Request::RemoveDomain { domain })?
            {
                if removed {
                    println!("Removed {}", domain);
                } else {
                    println!("{} was not permitted", domain);
                }
            }
            Ok(())
        }
        DomainAction::Check { host } => {
            let host = clean_domain_input(&host);
            let permitted = dispatcher.domains().is_permitted(host).map_err(|e| e.to_string())?;
            println!("{}: {}", host, if permitted { "permitted" } else { "not permitted" });
            Ok(())
        }
    }
}

fn cmd_replace(
    dispatcher: &mut CliDispatcher,
    input: &Path,
    tag: String,
    find: String,
    replace: String,
    literal: bool,
    output: Option<&Path>,
) -> Result<(), String> {
    let mut doc = page::read_page(input)?;
    let request = Request::ReplaceText {
        tag_selector: tag,
        find_pattern: find,
        replacement: replace,
        use_regex: Some(!literal),
    };

    let response = page::run_on_page(dispatcher, request, "", &mut doc)?;
    if let Response::Replaced(outcome) = response {
        eprintln!("Replaced in {} node(s)", outcome.count());
    }
    page::write_page(&doc, output)
}

fn cmd_apply(dispatcher: &mut CliDispatcher, input: &Path, host: &str, output: Option<&Path>) -> Result<(), String> {
    let mut doc = page::read_page(input)?;
    let response = page::run_on_page(dispatcher, Request::ApplyAllRules, host, &mut doc)?;
    if let Response::RulesApplied {
        rules_applied, message, ..
    } = response
    {
        eprintln!("{} ({} rule(s) for {})", message, rules_applied, host);
    }
    page::write_page(&doc, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_extract_options() {
        let cli = Cli::try_parse_from(["pt-cli", "extract", "--url", "https://a.test/", "--strategy", "regex"]).unwrap();
        match cli.command {
            Commands::Extract { url, file, strategy, .. } => {
                assert_eq!(url.as_deref(), Some("https://a.test/"));
                assert!(file.is_none());
                assert_eq!(strategy, Strategy::Regex);
            }
            _ => panic!("expected extract"),
        }

        assert!(Cli::try_parse_from(["pt-cli", "extract"]).is_err());
        assert!(Cli::try_parse_from(["pt-cli", "extract", "--url", "https://a.test/", "--file", "a.html"]).is_err());
    }

    #[test]
    fn rules_and_domains_round_trip_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store.json");

        let mut dispatcher = open_dispatcher(&store, Strategy::Regex).unwrap();
        cmd_rules(
            &mut dispatcher,
            RuleAction::Add {
                tag: "p".into(),
                find: "cat".into(),
                replace: "dog".into(),
                domain: "example.com".into(),
                literal: false,
            },
        )
        .unwrap();
        cmd_domains(&mut dispatcher, DomainAction::Add { domain: "www.example.com".into() }).unwrap();

        let mut reopened = open_dispatcher(&store, Strategy::Regex).unwrap();
        let rules = reopened.rules().list().unwrap();
        assert_eq!(rules.len(), 1);
        assert!(reopened.domains().is_permitted("news.example.com").unwrap());

        let missing = cmd_rules(&mut reopened, RuleAction::Delete { id: "nope".into() });
        assert!(missing.unwrap_err().starts_with("Rule not found"));
    }

    #[test]
    fn apply_uses_saved_rules() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("page.html");
        let output = dir.path().join("out.html");
        std::fs::write(&input, "<p>a cat</p>").unwrap();

        let mut dispatcher = open_dispatcher(&dir.path().join("store.json"), Strategy::Regex).unwrap();
        dispatcher
            .rules()
            .add(RuleDraft::new("p", "cat", "dog", "example.com"))
            .unwrap();

        cmd_apply(&mut dispatcher, &input, "example.com", Some(&output)).unwrap();
        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains("<p>a dog</p>"));
    }
}
