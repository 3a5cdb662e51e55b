use clap::Parser;
use rand::rngs::ThreadRng;
use rand::Rng;
use serde_json::{json, Map, Value};
use std::fs;

/// A CLI tool to generate synthetic flow definitions for the yurai analyzer
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The directory to write the generated definition files to
    #[arg(short, long, default_value = "generated_flows")]
    output: String,

    /// How many definitions to generate
    #[arg(short = 'n', long, default_value_t = 5)]
    count: usize,

    /// The minimum number of top-level actions per definition
    #[arg(long, default_value_t = 2)]
    min: usize,

    /// The maximum number of top-level actions per definition
    #[arg(long, default_value_t = 8)]
    max: usize,
}

const ENTITIES: &[&str] = &["contact", "account", "incident", "lead", "opportunity"];

const FIELDS: &[&str] = &[
    "firstname",
    "lastname",
    "emailaddress1",
    "telephone1",
    "description",
    "jobtitle",
];

const VARIABLES: &[&str] = &["varEmail", "varName", "varOwner", "counter"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut rng = rand::rng();

    if cli.min > cli.max {
        eprintln!(
            "Error: --min ({}) cannot be greater than --max ({})",
            cli.min, cli.max
        );
        std::process::exit(1);
    }

    println!(
        "Generating {} definition(s) ({} to {} top-level actions each)...",
        cli.count, cli.min, cli.max
    );
    fs::create_dir_all(&cli.output)?;

    for index in 0..cli.count {
        let action_count = rng.random_range(cli.min..=cli.max);
        let document = generate_definition(&mut rng, action_count);

        let file_name = format!("flow_{:02}.json", index);
        let path = format!("{}/{}", cli.output, file_name);
        fs::write(&path, serde_json::to_string_pretty(&document)?)?;
        println!(
            "-> Generated '{}' with {} top-level action(s).",
            file_name, action_count
        );
    }

    println!(
        "Successfully generated {} definition(s) in '{}'",
        cli.count, cli.output
    );

    Ok(())
}

/// Builds one complete definition document in the exported envelope format.
fn generate_definition(rng: &mut ThreadRng, action_count: usize) -> Value {
    json!({
        "properties": {
            "definition": {
                "triggers": {
                    "When_a_record_changes": generate_trigger(rng),
                },
                "actions": generate_actions(rng, action_count, true),
            }
        }
    })
}

fn generate_trigger(rng: &mut ThreadRng) -> Value {
    let entity = pick(rng, ENTITIES);
    match rng.random_range(0..3) {
        0 => json!({
            "type": "Request",
            "kind": "Button",
        }),
        1 => json!({
            "type": "Recurrence",
        }),
        _ => json!({
            "type": "OpenApiConnectionWebhook",
            "kind": "SubscribeWebhookTrigger",
            "inputs": {
                "parameters": {
                    "subscriptionRequest/entityname": entity,
                }
            }
        }),
    }
}

/// Generates a map of named actions. Container actions only appear at the
/// top level so nesting stays one deep.
fn generate_actions(rng: &mut ThreadRng, count: usize, allow_containers: bool) -> Value {
    let mut actions = Map::new();
    let mut declared = false;

    for index in 0..count {
        let upper = if allow_containers { 6 } else { 4 };
        let (name, action) = match rng.random_range(0..upper) {
            0 => (
                format!("Initialize_variable_{}", index),
                generate_initialize_variable(rng),
            ),
            1 if declared => (format!("Set_variable_{}", index), generate_set_variable(rng)),
            1 | 2 => (format!("Update_a_row_{}", index), generate_row_update(rng)),
            3 => (format!("Add_a_new_row_{}", index), generate_row_create(rng)),
            4 => (format!("Condition_{}", index), generate_condition(rng)),
            _ => (format!("Apply_to_each_{}", index), generate_foreach(rng)),
        };
        if action["type"] == "initialize-variable" {
            declared = true;
        }
        actions.insert(name, action);
    }
    Value::Object(actions)
}

fn generate_initialize_variable(rng: &mut ThreadRng) -> Value {
    let variable = pick(rng, VARIABLES);
    let field = pick(rng, FIELDS);
    json!({
        "type": "initialize-variable",
        "inputs": {
            "variables": [{
                "name": variable,
                "type": "string",
                "value": format!("@triggerBody()['{}']", field),
            }]
        }
    })
}

fn generate_set_variable(rng: &mut ThreadRng) -> Value {
    let variable = pick(rng, VARIABLES);
    json!({
        "type": "set-variable",
        "inputs": {
            "name": variable,
            "value": "manually set",
        }
    })
}

fn generate_row_update(rng: &mut ThreadRng) -> Value {
    let entity = pick(rng, ENTITIES);
    json!({
        "type": "row-update",
        "entity": entity,
        "inputs": generate_field_writes(rng),
    })
}

fn generate_row_create(rng: &mut ThreadRng) -> Value {
    let entity = pick(rng, ENTITIES);
    json!({
        "type": "row-create",
        "entity": entity,
        "inputs": generate_field_writes(rng),
    })
}

fn generate_condition(rng: &mut ThreadRng) -> Value {
    let variable = pick(rng, VARIABLES);
    let then_count = rng.random_range(1..=2);
    let then_actions = generate_actions(rng, then_count, false);
    let else_count = rng.random_range(1..=2);
    let else_actions = generate_actions(rng, else_count, false);
    json!({
        "type": "condition",
        "expression": format!("@equals(variables('{}'), '')", variable),
        "actions": then_actions,
        "else": {
            "actions": else_actions,
        }
    })
}

fn generate_foreach(rng: &mut ThreadRng) -> Value {
    let count = rng.random_range(1..=2);
    json!({
        "type": "for-each-loop",
        "foreach": "@outputs('List_rows')?['body/value']",
        "actions": generate_actions(rng, count, false),
    })
}

/// Two or three field writes mixing every provenance kind.
fn generate_field_writes(rng: &mut ThreadRng) -> Value {
    let mut fields = Map::new();

    let read_field = pick(rng, FIELDS);
    fields.insert(
        pick(rng, FIELDS).to_string(),
        json!(format!("@triggerBody()['{}']", read_field)),
    );
    fields.insert(
        pick(rng, FIELDS).to_string(),
        json!(format!("@variables('{}')", pick(rng, VARIABLES))),
    );
    if rng.random_bool(0.5) {
        fields.insert(pick(rng, FIELDS).to_string(), json!("a static value"));
    }
    Value::Object(fields)
}

fn pick<'a>(rng: &mut ThreadRng, pool: &[&'a str]) -> &'a str {
    pool[rng.random_range(0..pool.len())]
}
