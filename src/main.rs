use anyhow::{anyhow, bail, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use query_dsl::{QueryCompiler, Schema, SchemaConfig, Target};

const SCHEMA_FILE: &str = "schema.json";

const HELP: &str = "\
Commands:
  :target sql|es|text      choose the compilation target
  :model <name>            filter against another model
  :secondary <name>|none   set or clear the secondary model
  :models                  list known models
  :help                    show this help
Anything else is compiled, e.g.
  q(and(eq(name,install),contains(tags,debug)))      (sql, text)
  (components.type=ocp) and (team.name not_in [ci])  (es)";

/// Loads `schema.json`, falling back to the built-in models.
fn load_schema() -> SchemaConfig {
    match SchemaConfig::from_json_file(SCHEMA_FILE) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}, using built-in models", e);
            SchemaConfig::default()
        }
    }
}

struct Session {
    schema: SchemaConfig,
    compiler: QueryCompiler,
    target: Target,
    model: String,
    secondary: Option<String>,
}

impl Session {
    fn new(schema: SchemaConfig) -> Result<Self> {
        let model = ["jobs", "job_documents"]
            .into_iter()
            .find(|name| schema.model(name).is_some())
            .map(str::to_string)
            .or_else(|| schema.model_names().first().map(|name| name.to_string()))
            .ok_or_else(|| anyhow!("no model defined in {}", SCHEMA_FILE))?;
        Ok(Self {
            compiler: QueryCompiler::new(schema.limits),
            schema,
            target: Target::Relational,
            model,
            secondary: None,
        })
    }

    fn prompt(&self) -> String {
        let target = match self.target {
            Target::Relational => "sql",
            Target::SearchIndex => "es",
            Target::Text => "text",
        };
        format!("{}@{}> ", target, self.model)
    }

    fn command(&mut self, line: &str) -> Result<()> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let arg = words.next();
        match (command, arg) {
            (":help", _) => println!("{}", HELP),
            (":models", _) => println!("{}", self.schema.model_names().join(", ")),
            (":target", Some(name)) => {
                self.target =
                    Target::from_name(name).ok_or_else(|| anyhow!("unknown target {}", name))?;
            }
            (":model", Some(name)) => {
                self.require_model(name)?;
                self.model = name.to_string();
            }
            (":secondary", Some("none")) => self.secondary = None,
            (":secondary", Some(name)) => {
                self.require_model(name)?;
                self.secondary = Some(name.to_string());
            }
            _ => bail!("unknown command {}, try :help", line),
        }
        Ok(())
    }

    fn require_model(&self, name: &str) -> Result<()> {
        if self.schema.model(name).is_none() {
            bail!("unknown model {}", name);
        }
        Ok(())
    }

    fn compile(&self, raw: &str) -> Result<String> {
        let primary = self
            .schema
            .model(&self.model)
            .ok_or_else(|| anyhow!("unknown model {}", self.model))?;
        let mut schema = Schema::new(primary);
        if let Some(secondary) = self.secondary.as_deref().and_then(|name| self.schema.model(name)) {
            schema = schema.with_secondary(secondary);
        }
        let compiled = self.compiler.compile(raw, self.target, &schema)?;
        Ok(compiled.to_string())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut session = Session::new(load_schema())?;
    let mut editor = DefaultEditor::new()?;
    println!("query_dsl: filter compiler, :help for commands");

    loop {
        match editor.readline(&session.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line)?;
                let result = if line.starts_with(':') {
                    session.command(line)
                } else {
                    session.compile(line).map(|output| println!("{}", output))
                };
                if let Err(e) = result {
                    eprintln!("error: {}", e);
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
