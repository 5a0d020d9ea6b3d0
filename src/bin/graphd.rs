//! Thin binary exercising the `graphd` library: load a config, build a
//! small store with one primitive per requested id, compile a real
//! constraint that matches those guids, and run it through the execution
//! runloop, printing its cost/heatmap trace. Not a wire-protocol server;
//! the request dispatcher and transport are out of scope (see
//! `src/store/mod.rs`).

use std::sync::Arc;

use structopt::StructOpt;

use graphd::{
    budget::Budget,
    config::Config,
    constraint::{AtomicField, AtomicPredicate, AtomicValue, CompareOp, Constraint},
    exec::{run_constraint, Cost, Heatmap},
    gmap::Gmap,
    guid::{GuidMap, Id},
    hmap::Hmap,
    pattern::{Pattern, PatternKind, PrimitiveField},
    plan::Collaborators,
    primitive::{Primitive, PrimitiveStore},
    Guid, Result,
};

#[derive(Clone, StructOpt)]
struct Opt {
    #[structopt(long = "config")]
    config: Option<std::path::PathBuf>,

    #[structopt(long = "budget", default_value = "100000")]
    budget: i64,

    #[structopt(long = "ids", use_delimiter = true, default_value = "0")]
    ids: Vec<Id>,
}

fn main() {
    env_logger::init();
    let opts = Opt::from_args();

    match run(opts) {
        Ok(report) => println!("{}", report),
        Err(err) => {
            log::warn!("request failed: {}", err);
            eprintln!("error {}: {}", err.keyword(), err);
            std::process::exit(1);
        }
    }
}

fn run(opts: Opt) -> Result<String> {
    let config = match &opts.config {
        Some(path) => Config::from_toml_file(path)?,
        None => Config::default(),
    };

    let mut store = PrimitiveStore::new();
    let mut guids = GuidMap::new();
    let mut wanted_guids = Vec::with_capacity(opts.ids.len());
    for id in &opts.ids {
        while store.high_id() <= *id {
            let guid = Guid::generate();
            let assigned = store.append(Primitive::new(guid, 0));
            guids.insert(guid, assigned)?;
        }
        wanted_guids.push(store.get(*id)?.guid);
    }

    let collab = Collaborators {
        store: Arc::new(store),
        guids: Arc::new(guids),
        gmap_left: Arc::new(Gmap::new("left")),
        gmap_right: Arc::new(Gmap::new("right")),
        gmap_scope: Arc::new(Gmap::new("scope")),
        gmap_typeguid: Arc::new(Gmap::new("typeguid")),
        hmap_name: Arc::new(Hmap::new("name")),
        hmap_value: Arc::new(Hmap::new("value")),
        fast_intersect_max: config.fast_intersect_max,
    };

    let mut constraint = Constraint::new();
    constraint.atomic.push(AtomicPredicate {
        field: AtomicField::Guid,
        op: CompareOp::Eq,
        values: wanted_guids.into_iter().map(AtomicValue::Guid).collect(),
    });
    constraint.result_pattern = Some(Pattern::new(PatternKind::Field(PrimitiveField::Guid)));

    let mut budget = Budget::new(opts.budget);
    let mut cost = Cost::default();
    let mut heatmap = Heatmap::new();

    let result = run_constraint(&constraint, &collab, config.page_size_default, &mut budget, &mut cost, &mut heatmap, "root")?;

    let mut rendered = Vec::new();
    for (i, value) in result.values.iter().enumerate() {
        if i > 0 {
            rendered.push(b' ');
        }
        rendered.extend(value.render()?);
    }

    Ok(format!(
        "outcome={:?} results=({}) cost=\"{}\" heatmap=\"{}\"",
        result.outcome,
        String::from_utf8_lossy(&rendered),
        cost.render(),
        heatmap.render()
    ))
}
