use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicI64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{
    GroupDefinition, GroupId, PathDescriptor, WidgetAction, WidgetDefinition, WidgetId,
};

use crate::{
    settings::SettingsSource,
    signals::{PlaybackObserver, UiCommand, UiSignals},
    Clock, RotationContext,
};

pub(crate) const START: i64 = 1_700_000_000;

pub(crate) fn path(token: &str) -> PathDescriptor {
    PathDescriptor::simple(token)
}

pub(crate) fn widget(id: &str, group: &str, action: WidgetAction) -> WidgetDefinition {
    WidgetDefinition::new(WidgetId::new(id), GroupId::new(group), action)
}

#[derive(Default)]
struct MemoryState {
    groups: Vec<GroupDefinition>,
    paths: HashMap<GroupId, Vec<PathDescriptor>>,
    widgets: Vec<WidgetDefinition>,
    invalid: HashSet<WidgetId>,
    saves: usize,
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_saves: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn add_group(&self, id: &str, paths: &[&str]) {
        let mut state = self.state.lock().expect("store lock");
        let group_id = GroupId::new(id);
        state.groups.push(GroupDefinition {
            id: group_id.clone(),
            label: id.to_uppercase(),
        });
        state
            .paths
            .insert(group_id, paths.iter().map(|token| path(token)).collect());
    }

    pub(crate) fn add_widget(&self, widget: WidgetDefinition) {
        self.state.lock().expect("store lock").widgets.push(widget);
    }

    pub(crate) fn widget(&self, id: &str) -> WidgetDefinition {
        self.state
            .lock()
            .expect("store lock")
            .widgets
            .iter()
            .find(|widget| widget.id.as_str() == id)
            .cloned()
            .expect("widget exists")
    }

    pub(crate) fn mark_invalid(&self, id: &str) {
        self.state
            .lock()
            .expect("store lock")
            .invalid
            .insert(WidgetId::new(id));
    }

    pub(crate) fn saves(&self) -> usize {
        self.state.lock().expect("store lock").saves
    }

    pub(crate) fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(anyhow!("store offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl crate::WidgetStore for MemoryStore {
    async fn find_defined_widgets(
        &self,
        group_id: Option<&GroupId>,
    ) -> Result<Vec<WidgetDefinition>> {
        self.check_reads()?;
        let state = self.state.lock().expect("store lock");
        Ok(state
            .widgets
            .iter()
            .filter(|widget| group_id.map_or(true, |group_id| widget.group_id == *group_id))
            .cloned()
            .collect())
    }

    async fn find_defined_groups(&self) -> Result<Vec<GroupDefinition>> {
        self.check_reads()?;
        Ok(self.state.lock().expect("store lock").groups.clone())
    }

    async fn find_defined_paths(&self, group_id: &GroupId) -> Result<Vec<PathDescriptor>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .expect("store lock")
            .paths
            .get(group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_widget_by_id(&self, widget_id: &WidgetId) -> Result<Option<WidgetDefinition>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .expect("store lock")
            .widgets
            .iter()
            .find(|widget| widget.id == *widget_id)
            .cloned())
    }

    async fn save_path_details(&self, widget: &WidgetDefinition) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        let mut state = self.state.lock().expect("store lock");
        state.saves += 1;
        if let Some(stored) = state.widgets.iter_mut().find(|stored| stored.id == widget.id) {
            *stored = widget.clone();
        }
        Ok(())
    }

    async fn clean(&self, widget_id: &WidgetId) -> Result<bool> {
        self.check_reads()?;
        let state = self.state.lock().expect("store lock");
        if state.invalid.contains(widget_id) {
            return Ok(false);
        }
        Ok(state
            .widgets
            .iter()
            .find(|widget| widget.id == *widget_id)
            .map_or(true, |widget| widget.validate().is_ok()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Notification {
    pub(crate) title: String,
    pub(crate) message: String,
    pub(crate) sound: bool,
}

#[derive(Default)]
struct UiLog {
    properties: HashMap<String, String>,
    notifications: Vec<Notification>,
    commands: Vec<(UiCommand, Duration)>,
    container_refreshes: usize,
}

#[derive(Default)]
pub(crate) struct RecordingUi {
    log: Mutex<UiLog>,
}

impl RecordingUi {
    pub(crate) fn property(&self, key: &str) -> Option<String> {
        self.log.lock().expect("ui lock").properties.get(key).cloned()
    }

    pub(crate) fn notifications(&self) -> Vec<Notification> {
        self.log.lock().expect("ui lock").notifications.clone()
    }

    pub(crate) fn commands(&self) -> Vec<UiCommand> {
        self.log
            .lock()
            .expect("ui lock")
            .commands
            .iter()
            .map(|(command, _)| *command)
            .collect()
    }

    pub(crate) fn container_refreshes(&self) -> usize {
        self.log.lock().expect("ui lock").container_refreshes
    }
}

impl UiSignals for RecordingUi {
    fn set_display_property(&self, key: &str, value: &str) {
        self.log
            .lock()
            .expect("ui lock")
            .properties
            .insert(key.to_owned(), value.to_owned());
    }

    fn clear_display_property(&self, key: &str) {
        self.log.lock().expect("ui lock").properties.remove(key);
    }

    fn refresh_container(&self) {
        self.log.lock().expect("ui lock").container_refreshes += 1;
    }

    fn show_notification(&self, title: &str, message: &str, sound: bool) {
        self.log
            .lock()
            .expect("ui lock")
            .notifications
            .push(Notification {
                title: title.to_owned(),
                message: message.to_owned(),
                sound,
            });
    }

    fn dispatch_ui_command(&self, command: UiCommand, settle: Duration) {
        self.log
            .lock()
            .expect("ui lock")
            .commands
            .push((command, settle));
    }
}

#[derive(Default)]
pub(crate) struct PlaybackSwitch {
    playing: AtomicBool,
}

impl PlaybackSwitch {
    pub(crate) fn set(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }
}

impl PlaybackObserver for PlaybackSwitch {
    fn is_playing_video(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

pub(crate) struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub(crate) fn at(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub(crate) fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Default)]
pub(crate) struct StaticSettings {
    values: Mutex<HashMap<String, SettingValue>>,
    reloads: AtomicI64,
}

impl StaticSettings {
    pub(crate) fn set(&self, key: &str, value: SettingValue) {
        self.values
            .lock()
            .expect("settings lock")
            .insert(key.to_owned(), value);
    }

    pub(crate) fn remove(&self, key: &str) {
        self.values.lock().expect("settings lock").remove(key);
    }

    pub(crate) fn reloads(&self) -> i64 {
        self.reloads.load(Ordering::SeqCst)
    }

    fn value(&self, key: &str) -> Option<SettingValue> {
        self.values.lock().expect("settings lock").get(key).cloned()
    }
}

impl SettingsSource for StaticSettings {
    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.value(key)? {
            SettingValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.value(key)? {
            SettingValue::Int(value) => Some(value),
            _ => None,
        }
    }

    fn get_float(&self, key: &str) -> Option<f64> {
        match self.value(key)? {
            SettingValue::Float(value) => Some(value),
            SettingValue::Int(value) => Some(value as f64),
            _ => None,
        }
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.value(key)? {
            SettingValue::Text(value) => Some(value),
            _ => None,
        }
    }

    fn reload(&self) -> Result<()> {
        self.reloads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) store: Arc<MemoryStore>,
    pub(crate) ui: Arc<RecordingUi>,
    pub(crate) playback: Arc<PlaybackSwitch>,
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) ctx: RotationContext,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        let ui = Arc::new(RecordingUi::default());
        let playback = Arc::new(PlaybackSwitch::default());
        let clock = Arc::new(FixedClock::at(START));
        let ctx = RotationContext::new(store.clone(), ui.clone(), playback.clone())
            .with_clock(clock.clone());
        Self {
            store,
            ui,
            playback,
            clock,
            ctx,
        }
    }
}
