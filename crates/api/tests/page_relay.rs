//! The relay forwards page updates from the event bus to subscribed sockets.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use curico_api::notifications::PageRelay;
use curico_api::ws::WsManager;
use curico_db::models::page::Page;
use curico_db::models::status::PageStatus;
use curico_events::{EventBus, PipelineEvent};

fn completed_page(id: i64, story_id: i64) -> Page {
    let now = chrono::Utc::now();
    Page {
        id,
        story_id,
        page_num: 1,
        content_text: "Luna looked up at the stars.".into(),
        image_url: Some(format!("https://cdn.test/images/{story_id}/{id}.png")),
        status_id: PageStatus::Complete.id(),
        error_message: None,
        claimed_at: Some(now),
        completed_at: Some(now),
        created_at: now,
        updated_at: now,
    }
}

fn parse(message: Message) -> serde_json::Value {
    let Message::Text(text) = message else {
        panic!("expected a text frame, got {message:?}");
    };
    serde_json::from_str(text.as_str()).unwrap()
}

#[tokio::test]
async fn page_updates_reach_story_subscribers_only() {
    let manager = Arc::new(WsManager::new());
    let mut watcher = manager.add("watcher".into(), 1).await;
    let mut bystander = manager.add("bystander".into(), 1).await;
    manager.subscribe("watcher", 5).await;
    manager.subscribe("bystander", 6).await;

    let bus = EventBus::default();
    let handle = tokio::spawn(PageRelay::new(Arc::clone(&manager)).run(bus.subscribe()));

    bus.publish(PipelineEvent::story_created(5, 1, 12));
    bus.publish(PipelineEvent::page_updated(completed_page(40, 5)));

    let frame = tokio::time::timeout(Duration::from_secs(1), watcher.recv())
        .await
        .unwrap()
        .unwrap();
    let json = parse(frame);
    assert_eq!(json["type"], "page_updated");
    assert_eq!(json["story_id"], 5);
    assert_eq!(json["page"]["id"], 40);
    assert_eq!(json["page"]["image_url"], "https://cdn.test/images/5/40.png");

    drop(bus);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("relay should stop when the bus is dropped")
        .unwrap();

    assert!(watcher.try_recv().is_err());
    assert!(bystander.try_recv().is_err());
}
