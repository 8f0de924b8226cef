use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use rotation::{
    PlaybackObserver, RotationContext, RotationService, SettingsSource, UiCommand, UiSignals,
    WidgetStore,
};
use shared::{
    domain::{PathDescriptor, WidgetAction, WidgetDefinition, WidgetId},
    protocol::{Outcome, PassStatus},
};
use storage::Storage;

#[derive(Default)]
struct Board {
    properties: Mutex<BTreeMap<String, String>>,
    notifications: Mutex<usize>,
}

impl Board {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.lock().expect("board lock").get(key).cloned()
    }
}

impl UiSignals for Board {
    fn set_display_property(&self, key: &str, value: &str) {
        self.properties
            .lock()
            .expect("board lock")
            .insert(key.to_string(), value.to_string());
    }

    fn clear_display_property(&self, key: &str) {
        self.properties.lock().expect("board lock").remove(key);
    }

    fn refresh_container(&self) {}

    fn show_notification(&self, _title: &str, _message: &str, _sound: bool) {
        *self.notifications.lock().expect("board lock") += 1;
    }

    fn dispatch_ui_command(&self, _command: UiCommand, _settle: Duration) {}
}

struct Idle;

impl PlaybackObserver for Idle {
    fn is_playing_video(&self) -> bool {
        false
    }
}

struct Defaults;

impl SettingsSource for Defaults {
    fn get_bool(&self, _key: &str) -> Option<bool> {
        None
    }

    fn get_int(&self, _key: &str) -> Option<i64> {
        None
    }

    fn get_float(&self, _key: &str) -> Option<f64> {
        None
    }

    fn get_string(&self, _key: &str) -> Option<String> {
        None
    }
}

#[tokio::test]
async fn rotation_and_paging_persist_through_sqlite() {
    let storage = Arc::new(Storage::new("sqlite::memory:").await.expect("db"));
    let group = storage.create_group("Library").await.expect("group");
    for target in ["library://a/", "library://b/", "library://c/"] {
        storage
            .add_path(&group, &PathDescriptor::simple(target))
            .await
            .expect("path");
    }

    let first = WidgetDefinition::new(WidgetId::new("w1"), group.clone(), WidgetAction::Sequential);
    let second = WidgetDefinition::new(WidgetId::new("w2"), group.clone(), WidgetAction::Sequential);
    let pinned = WidgetDefinition::new(WidgetId::new("w3"), group.clone(), WidgetAction::Static);
    for widget in [&first, &second, &pinned] {
        storage.create_widget(widget).await.expect("widget");
    }

    let board = Arc::new(Board::default());
    let ctx = RotationContext::new(storage.clone(), board.clone(), Arc::new(Idle));
    let service = RotationService::new(ctx, Arc::new(Defaults));

    let report = service.on_start().await.expect("startup");
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.rotated, vec![first.id.clone(), second.id.clone()]);

    let w1 = storage
        .get_widget_by_id(&first.id)
        .await
        .expect("load")
        .expect("w1");
    let w2 = storage
        .get_widget_by_id(&second.id)
        .await
        .expect("load")
        .expect("w2");
    assert_eq!(w1.path, Some(PathDescriptor::simple("library://a/")));
    assert_eq!(w2.path, Some(PathDescriptor::simple("library://b/")));
    assert!(w1.updated > 0);
    assert!(board.property("widget-w1-refresh").is_some());
    assert!(board.property("widget-w3-refresh").is_none());

    let outcome = service
        .next(
            &first.id,
            PathDescriptor::composite("Recently added", "library://a/recent/"),
        )
        .await
        .expect("next");
    assert_eq!(outcome, Outcome::Applied);

    let paged = storage
        .get_widget_by_id(&first.id)
        .await
        .expect("load")
        .expect("w1");
    assert_eq!(paged.stack, vec![PathDescriptor::simple("library://a/")]);
    assert_eq!(
        paged.path,
        Some(PathDescriptor::composite("Recently added", "library://a/recent/"))
    );

    let outcome = service.back(&first.id).await.expect("back");
    assert_eq!(outcome, Outcome::Applied);
    let restored = storage
        .get_widget_by_id(&first.id)
        .await
        .expect("load")
        .expect("w1");
    assert_eq!(restored.path, Some(PathDescriptor::simple("library://a/")));
    assert!(restored.stack.is_empty());

    let forced = service.force_refresh_all().await.expect("forced");
    assert_eq!(forced.rotated.len(), 2);
    assert_eq!(*board.notifications.lock().expect("board lock"), 1);

    let rotated = storage
        .get_widget_by_id(&first.id)
        .await
        .expect("load")
        .expect("w1");
    assert_eq!(rotated.updated, 0);
    assert_eq!(rotated.path, Some(PathDescriptor::simple("library://b/")));

    service.shutdown().await;
}

#[tokio::test]
async fn startup_resets_widgets_stuck_in_an_invalid_state() {
    let storage = Arc::new(Storage::new("sqlite::memory:").await.expect("db"));
    let group = storage.create_group("Library").await.expect("group");

    let mut stuck = WidgetDefinition::new(WidgetId::new("stuck"), group, WidgetAction::Static);
    stuck.path = Some(PathDescriptor::simple("deep"));
    stuck.stack = vec![
        PathDescriptor::composite("Root", "root"),
        PathDescriptor::simple("deep"),
    ];
    stuck.label = "Root".into();
    storage.create_widget(&stuck).await.expect("widget");
    assert!(!storage.clean(&stuck.id).await.expect("clean"));

    let board = Arc::new(Board::default());
    let ctx = RotationContext::new(storage.clone(), board.clone(), Arc::new(Idle));
    let service = RotationService::new(ctx, Arc::new(Defaults));
    service.on_start().await.expect("startup");

    let recovered = storage
        .get_widget_by_id(&stuck.id)
        .await
        .expect("load")
        .expect("stuck");
    assert_eq!(recovered.path, Some(PathDescriptor::composite("Root", "root")));
    assert!(recovered.stack.is_empty());
    assert!(recovered.label.is_empty());
    assert!(storage.clean(&stuck.id).await.expect("clean"));

    service.shutdown().await;
}
