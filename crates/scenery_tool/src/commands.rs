use std::path::Path;

use scenery::config::parse_element_list;
use scenery::data::LegacySceneryData;
use scenery::host::scene_file::FileHost;
use scenery::{
    read_scenery_data, write_scenery_data, CopyRequest, FlagStore, SceneryConfig, SceneryHost,
    SceneryManager, VariationCard, FLAG_KEY, MODULE_ID,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::{Cli, Command};

/// One loaded scene, displayed on the canvas of a single user.
struct Session {
    host: FileHost,
    manager: SceneryManager,
    scene_id: String,
}

impl Session {
    fn open(cli: &Cli, config: SceneryConfig, scene: &Path) -> Result<Self, String> {
        let mut host = FileHost::new(&cli.data_root)
            .with_role(!cli.player)
            .with_assume_yes(cli.yes);
        let scene_id = host.load_scene(scene).map_err(|error| error.to_string())?;
        host.view(&scene_id);

        let mut manager = SceneryManager::new(config);
        manager.on_canvas_init(&mut host);
        manager.on_canvas_ready(&mut host);
        Ok(Self {
            host,
            manager,
            scene_id,
        })
    }

    fn save(&self) -> Result<(), String> {
        self.host.save().map_err(|error| error.to_string())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SceneReport<'a> {
    scene_id: &'a str,
    active_variation_index: usize,
    displayed_background: Option<&'a str>,
    variations: Vec<CardReport<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardReport<'a> {
    index: usize,
    name: &'a str,
    gm_background: &'a str,
    pl_background: &'a str,
    is_active: bool,
    scene_data: Option<&'a str>,
    live: bool,
}

impl<'a> From<&'a VariationCard> for CardReport<'a> {
    fn from(card: &'a VariationCard) -> Self {
        Self {
            index: card.index,
            name: &card.name,
            gm_background: &card.gm_background,
            pl_background: &card.pl_background,
            is_active: card.is_active,
            scene_data: card.scene_data_summary.as_deref(),
            live: card.is_live_capture,
        }
    }
}

pub(crate) fn run(cli: &Cli, config: SceneryConfig) -> Result<(), String> {
    match &cli.command {
        Command::Show(args) => show(&Session::open(cli, config, &args.scene)?),
        Command::Migrate(args) => migrate(Session::open(cli, config, &args.scene)?),
        Command::Scan(args) => scan(Session::open(cli, config, &args.scene)?),
        Command::Switch(args) => switch(Session::open(cli, config, &args.scene)?, args.index),
        Command::Copy(args) => {
            let selection =
                parse_element_list("--types", &args.types).map_err(|error| error.to_string())?;
            let request = CopyRequest {
                source_index: Some(args.from),
                target_index: args.to,
                selection,
                reset_unselected: args.reset_unselected,
            };
            copy(Session::open(cli, config, &args.scene)?, &request)
        }
        Command::Reset(args) => reset(Session::open(cli, config, &args.scene)?, args.index),
        Command::Delete(args) => delete(Session::open(cli, config, &args.scene)?, args.index),
    }
}

fn show(session: &Session) -> Result<(), String> {
    let form = session
        .manager
        .prepare_form(&session.host, &session.scene_id)
        .map_err(|error| error.to_string())?;
    let report = SceneReport {
        scene_id: &session.scene_id,
        active_variation_index: form.active_index,
        displayed_background: session.host.displayed_background(),
        variations: form.cards.iter().map(CardReport::from).collect(),
    };
    let text = serde_json::to_string_pretty(&report).map_err(|error| error.to_string())?;
    println!("{text}");
    Ok(())
}

fn migrate(mut session: Session) -> Result<(), String> {
    let Some(scene) = session.host.scene_mut(&session.scene_id) else {
        return Err(format!("scene '{}' is not loaded", session.scene_id));
    };
    let is_legacy = scene
        .get_flag(MODULE_ID, FLAG_KEY)
        .is_some_and(|raw| LegacySceneryData::detect(&raw));
    if !is_legacy {
        println!("{}: already current", session.scene_id);
        return Ok(());
    }
    let Some(data) = read_scenery_data(&*scene) else {
        warn!(scene_id = %session.scene_id, "legacy_data_unreadable");
        return Err(format!("{}: legacy data is unreadable", session.scene_id));
    };
    write_scenery_data(scene, &data).map_err(|error| error.to_string())?;
    session.save()?;
    println!(
        "{}: migrated {} variations",
        session.scene_id,
        data.variations.len()
    );
    Ok(())
}

fn scan(mut session: Session) -> Result<(), String> {
    let Session {
        host,
        manager,
        scene_id,
    } = &mut session;
    let mut form = manager
        .prepare_form(host, scene_id)
        .map_err(|error| error.to_string())?;
    let default_before = form.rows.first().map(|row| row.gm_background.clone());
    let added = manager
        .scan_into_form(host, &mut form)
        .map_err(|error| error.to_string())?;
    let default_changed = form.rows.first().map(|row| row.gm_background.clone()) != default_before;
    if added == 0 && !default_changed {
        println!("{scene_id}: no new variations found");
        return Ok(());
    }

    manager
        .sync_form(host, &mut form)
        .map_err(|error| error.to_string())?;
    session.save()?;
    for row in form.rows.iter().skip(1) {
        println!("{}\t{}\t{}", row.name, row.gm_background, row.pl_background);
    }
    info!(added, default_changed, "scan_saved");
    Ok(())
}

fn switch(mut session: Session, index: usize) -> Result<(), String> {
    let Session {
        host,
        manager,
        scene_id,
    } = &mut session;
    let mut form = manager
        .prepare_form(host, scene_id)
        .map_err(|error| error.to_string())?;
    if index >= form.rows.len() {
        return Err(format!(
            "variation {index} does not exist ({} variations)",
            form.rows.len()
        ));
    }
    form.active_index = index;
    let data = manager
        .submit_form(host, &mut form)
        .map_err(|error| error.to_string())?;
    let name = data
        .active()
        .map(|variation| variation.name.clone())
        .unwrap_or_default();
    let displayed = host.displayed_background().unwrap_or_default().to_string();
    session.save()?;
    println!("{}: active variation {index} ({name}) showing {displayed}", session.scene_id);
    Ok(())
}

fn copy(mut session: Session, request: &CopyRequest) -> Result<(), String> {
    let Session {
        host,
        manager,
        scene_id,
    } = &mut session;
    let mut form = manager
        .prepare_form(host, scene_id)
        .map_err(|error| error.to_string())?;
    let summary = manager
        .copy_elements(host, &mut form, request)
        .map_err(|error| error.to_string())?;
    session.save()?;
    println!("{}: copied {summary}", session.scene_id);
    Ok(())
}

fn reset(mut session: Session, index: usize) -> Result<(), String> {
    let Session {
        host,
        manager,
        scene_id,
    } = &mut session;
    let mut form = manager
        .prepare_form(host, scene_id)
        .map_err(|error| error.to_string())?;
    let removed = manager
        .reset_scene_data(host, &mut form, index)
        .map_err(|error| error.to_string())?;
    if removed {
        session.save()?;
        println!("{}: scene data of variation {index} removed", session.scene_id);
    } else {
        println!("{}: nothing to reset", session.scene_id);
    }
    Ok(())
}

fn delete(mut session: Session, index: usize) -> Result<(), String> {
    let Session {
        host,
        manager,
        scene_id,
    } = &mut session;
    let mut form = manager
        .prepare_form(host, scene_id)
        .map_err(|error| error.to_string())?;
    let deleted = manager
        .delete_variation(host, &mut form, index)
        .map_err(|error| error.to_string())?;
    if deleted {
        session.save()?;
        println!("{}: variation {index} deleted", session.scene_id);
    } else {
        println!("{}: variation {index} kept", session.scene_id);
    }
    Ok(())
}
