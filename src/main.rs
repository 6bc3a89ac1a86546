// Demo host: a sidebar list of locations next to an interactive map view
use std::path::PathBuf;

use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy::ui::IsDefaultUiCamera;
use bevy::window::PrimaryWindow;
use clap::Parser;
use rand::Rng;

use location_map::feed::{load_locations, search, sort_by_recency, SortOrder};
use location_map::markers::visible_locations;
use location_map::{
    queue_dispose, spawn_map_view, ClearSelection, FillWindow, FlyToRequest, Location, LocationSelected, MapError,
    MapInput, MapViewConfig, MapViewHandle, MapViewPlugin, MapViewSystems, OwnerProfile, ViewContainer,
};

const SIDEBAR_WIDTH: f32 = 300.0; // logical px
const SIDEBAR_ROWS: usize = 24;
const DEMO_OWNERS: [&str; 4] = ["alice", "bob", "carol", "dave"];
const DEMO_NAMES: [&str; 8] = [
    "Spawn", "Lighthouse", "Quarry", "Farm", "Harbor", "Tower", "Mine Entrance", "Village",
];
const DEMO_SPREAD: f32 = 40.0;

#[derive(Parser, Resource, Debug, Clone)]
#[command(name = "location-map", about = "Browse shared locations on a 3D map")]
struct Args {
    /// JSON feed of location rows
    #[arg(long)]
    locations: Option<PathBuf>,
    /// Owner id of the viewer; their markers use the owned colour
    #[arg(long)]
    viewer: Option<String>,
    /// TOML file overriding MapViewConfig defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Start with only the viewer's locations shown
    #[arg(long)]
    mine_only: bool,
    /// Number of random locations when no feed is given
    #[arg(long, default_value_t = 40)]
    demo_count: usize,
    /// Give the whole window to the map
    #[arg(long)]
    hide_sidebar: bool,
    /// Only list locations whose name contains this text
    #[arg(long, default_value = "")]
    search: String,
}

/// Host-side state: the list the sidebar shows and the inputs of the map.
#[derive(Resource, Debug)]
struct HostState {
    locations: Vec<Location>,
    mine_only: bool,
    viewer: Option<String>,
    query: String,
    cursor: usize,
    selected: Option<Location>,
}

impl HostState {
    fn map_input(&self) -> MapInput {
        let mut input = MapInput::new(self.locations.clone()).with_mine_only(self.mine_only);
        input.viewer_id = self.viewer.clone();
        input
    }

    /// Sidebar rows: the map's visible set narrowed by the name search.
    fn listed(&self) -> Vec<Location> {
        let visible: Vec<Location> = visible_locations(&self.map_input()).cloned().collect();
        search(&visible, &self.query).into_iter().cloned().collect()
    }

    fn set_locations(&mut self, mut locations: Vec<Location>) {
        sort_by_recency(&mut locations, SortOrder::NewestFirst);
        self.locations = locations;
        self.cursor = self.cursor.min(self.listed().len().saturating_sub(1));
    }
}

/// The mounted view, if any. Taken out when the view is disposed.
#[derive(Resource, Default)]
struct MountedView(Option<MapViewHandle>);

#[derive(Component)]
struct SidebarList;

#[derive(Component)]
struct DetailsText;

fn main() -> AppExit {
    let args = Args::parse();

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(LogPlugin {
                    filter: "wgpu=error,naga=warn,location_map=info".into(),
                    ..default()
                })
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Location Map".into(),
                        ..default()
                    }),
                    ..default()
                }),
        )
        .add_plugins(MapViewPlugin)
        .insert_resource(args)
        .init_resource::<MountedView>()
        .add_systems(Startup, (load_inputs, mount_map_view, spawn_sidebar).chain())
        .add_systems(
            Update,
            (layout_system, keyboard_system, sync_map_input_system)
                .chain()
                .before(MapViewSystems),
        )
        .add_systems(
            Update,
            (selection_events_system, refresh_sidebar_system)
                .chain()
                .after(MapViewSystems),
        )
        .run()
}

fn load_state(args: &Args) -> Result<(Option<MapViewConfig>, HostState), MapError> {
    let config = args.config.as_deref().map(MapViewConfig::load).transpose()?;

    let (locations, viewer) = match &args.locations {
        Some(path) => (load_locations(path)?, args.viewer.clone()),
        None => {
            let viewer = args.viewer.clone().or_else(|| Some(DEMO_OWNERS[0].to_string()));
            (demo_locations(args.demo_count), viewer)
        }
    };

    let mut state = HostState {
        locations: Vec::new(),
        mine_only: args.mine_only,
        viewer,
        query: args.search.clone(),
        cursor: 0,
        selected: None,
    };
    state.set_locations(locations);
    Ok((config, state))
}

fn demo_locations(count: usize) -> Vec<Location> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let owner = DEMO_OWNERS[rng.gen_range(0..DEMO_OWNERS.len())];
            let name = DEMO_NAMES[rng.gen_range(0..DEMO_NAMES.len())];
            let position = Vec3::new(
                rng.gen_range(-DEMO_SPREAD..DEMO_SPREAD),
                rng.gen_range(0.0..6.0),
                rng.gen_range(-DEMO_SPREAD..DEMO_SPREAD),
            );
            let mut location = Location::new(i as i64 + 1, owner, format!("{name} #{}", i + 1), position)
                .with_owner(OwnerProfile {
                    display_name: Some(owner.to_string()),
                    avatar_ref: None,
                });
            location.created_at = format!("2024-01-{:02}T{:02}:00:00Z", 1 + i % 28, rng.gen_range(0..24));
            location
        })
        .collect()
}

/// Container of the map: the window minus the sidebar, in physical pixels.
fn map_container(window: &Window, hide_sidebar: bool) -> ViewContainer {
    let sidebar = if hide_sidebar {
        0
    } else {
        (SIDEBAR_WIDTH * window.scale_factor()).round() as u32
    };
    ViewContainer::new(
        UVec2::new(sidebar, 0),
        UVec2::new(window.physical_width().saturating_sub(sidebar), window.physical_height()),
    )
}

/// System: Load config and locations; a failure ends the app with an error code
fn load_inputs(args: Res<Args>, mut commands: Commands, mut exit: EventWriter<AppExit>) {
    match load_state(&args) {
        Ok((config, state)) => {
            if let Some(config) = config {
                commands.insert_resource(config);
            }
            info!("Loaded {} locations", state.locations.len());
            commands.insert_resource(state);
        }
        Err(err) => {
            error!("Startup failed: {err}");
            exit.write(AppExit::error());
        }
    }
}

fn mount_map_view(world: &mut World) {
    let Some(input) = world.get_resource::<HostState>().map(HostState::map_input) else { return };
    let hide_sidebar = world.get_resource::<Args>().is_some_and(|args| args.hide_sidebar);

    let mut windows = world.query_filtered::<&Window, With<PrimaryWindow>>();
    let container = windows
        .single(world)
        .map(|window| map_container(window, hide_sidebar))
        .unwrap_or_default();

    let handle = spawn_map_view(world, container, input);
    if hide_sidebar {
        world.entity_mut(handle.view).insert(FillWindow);
    }
    world.insert_resource(MountedView(Some(handle)));
}

/// System: Spawn the host UI (sidebar with list and details)
fn spawn_sidebar(mut commands: Commands, args: Res<Args>) {
    commands.spawn((
        Camera2d,
        Camera {
            order: 100,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        IsDefaultUiCamera,
    ));

    if args.hide_sidebar {
        return;
    }

    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                top: Val::Px(0.0),
                width: Val::Px(SIDEBAR_WIDTH),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(10.0),
                padding: UiRect::all(Val::Px(10.0)),
                ..default()
            },
            BackgroundColor(Color::srgb(0.13, 0.13, 0.15)),
        ))
        .with_children(|sidebar| {
            sidebar.spawn((
                Text::new("Locations"),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(Color::WHITE),
            ));
            sidebar.spawn((
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgb(0.85, 0.85, 0.85)),
                SidebarList,
            ));
            sidebar.spawn((
                Text::new(""),
                TextFont {
                    font_size: 14.0,
                    ..default()
                },
                TextColor(Color::srgb(0.3, 0.95, 0.4)),
                DetailsText,
            ));
            sidebar.spawn((
                Text::new("Up/Down: Browse | Enter: Fly to\nM: Mine only | Esc: Deselect\nR: Reload feed | V: Toggle map"),
                TextFont {
                    font_size: 12.0,
                    ..default()
                },
                TextColor(Color::srgb(0.6, 0.6, 0.6)),
            ));
        });
}

/// System: Keep the map container next to the sidebar as the window resizes
fn layout_system(
    args: Res<Args>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut containers: Query<&mut ViewContainer, Without<FillWindow>>,
) {
    let Ok(window) = windows.single() else { return };
    let container = map_container(window, args.hide_sidebar);
    for mut current in containers.iter_mut() {
        current.set_if_neq(container);
    }
}

/// System: Host key bindings
fn keyboard_system(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    args: Res<Args>,
    state: Option<ResMut<HostState>>,
    mut mounted: ResMut<MountedView>,
    mut fly_to: EventWriter<FlyToRequest>,
    mut clear: EventWriter<ClearSelection>,
) {
    let Some(mut state) = state else { return };
    let view = mounted.0.as_ref().map(|handle| handle.view);
    let listed = state.listed();

    if keyboard.just_pressed(KeyCode::ArrowDown) && state.cursor + 1 < listed.len() {
        state.cursor += 1;
    }
    if keyboard.just_pressed(KeyCode::ArrowUp) && state.cursor > 0 {
        state.cursor -= 1;
    }

    if keyboard.just_pressed(KeyCode::Enter) {
        let target = listed.get(state.cursor).and_then(Location::position);
        if let (Some(view), Some(point)) = (view, target) {
            fly_to.write(FlyToRequest { view, point });
        }
    }

    if keyboard.just_pressed(KeyCode::KeyM) {
        if state.viewer.is_some() {
            state.mine_only = !state.mine_only;
            state.cursor = 0;
            info!("Mine-only filter {}", if state.mine_only { "on" } else { "off" });
        } else {
            warn!("Mine-only needs --viewer");
        }
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        if let Some(view) = view {
            clear.write(ClearSelection { view });
        }
    }

    if keyboard.just_pressed(KeyCode::KeyR) {
        match args.locations.as_deref().map(load_locations) {
            Some(Ok(locations)) => {
                info!("Reloaded {} locations", locations.len());
                state.set_locations(locations);
            }
            Some(Err(err)) => warn!("Reload failed: {err}"),
            None => debug!("No feed file to reload"),
        }
    }

    if keyboard.just_pressed(KeyCode::KeyV) {
        match mounted.0.take() {
            Some(handle) => {
                queue_dispose(&mut commands, handle);
                state.selected = None;
            }
            None => commands.queue(mount_map_view),
        }
    }
}

/// System: Hand the host's current list and filter to the map
fn sync_map_input_system(
    state: Option<Res<HostState>>,
    mounted: Res<MountedView>,
    mut inputs: Query<&mut MapInput>,
) {
    let Some(state) = state else { return };
    if !state.is_changed() && !mounted.is_changed() {
        return;
    }
    let Some(view) = mounted.0.as_ref().map(|handle| handle.view) else { return };
    if let Ok(mut input) = inputs.get_mut(view) {
        input.set_if_neq(state.map_input());
    }
}

/// System: Mirror the map's selection callbacks into the details panel
fn selection_events_system(mut events: EventReader<LocationSelected>, state: Option<ResMut<HostState>>) {
    let Some(mut state) = state else {
        events.clear();
        return;
    };
    for event in events.read() {
        state.selected = event.location.clone();
    }
}

fn describe(location: &Location) -> String {
    let mut text = format!("{}\n({:.1}, {:.1}, {:.1})", location.name, location.x, location.y, location.z);
    if let Some(owner) = location.owner_display_name() {
        text.push_str(&format!("\nby {owner}"));
    }
    if let Some(description) = &location.description {
        text.push_str(&format!("\n{description}"));
    }
    if !location.recency_key().is_empty() {
        text.push_str(&format!("\n{}", location.recency_key()));
    }
    text
}

/// System: Redraw the sidebar text when the host state changes
fn refresh_sidebar_system(
    state: Option<Res<HostState>>,
    mut lists: Query<&mut Text, (With<SidebarList>, Without<DetailsText>)>,
    mut details: Query<&mut Text, (With<DetailsText>, Without<SidebarList>)>,
) {
    let Some(state) = state else { return };
    if !state.is_changed() {
        return;
    }

    let listed = state.listed();
    let first = state.cursor.saturating_sub(SIDEBAR_ROWS / 2);
    let rows: Vec<String> = listed
        .iter()
        .enumerate()
        .skip(first)
        .take(SIDEBAR_ROWS)
        .map(|(i, location)| {
            let marker = if i == state.cursor { ">" } else { " " };
            let owner = location.owner_display_name().unwrap_or(&location.owner_id);
            format!("{marker} {} ({owner})", location.name)
        })
        .collect();

    if let Ok(mut list) = lists.single_mut() {
        let mut header = format!("{} shown", listed.len());
        if state.mine_only {
            header.push_str(", mine only");
        }
        if !state.query.trim().is_empty() {
            header.push_str(&format!(", matching \"{}\"", state.query.trim()));
        }
        list.0 = format!("{header}\n{}", rows.join("\n"));
    }
    if let Ok(mut text) = details.single_mut() {
        text.0 = match &state.selected {
            Some(location) => describe(location),
            None => "Nothing selected".to_string(),
        };
    }
}
