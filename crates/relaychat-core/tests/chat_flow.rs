use std::io::Cursor;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use image::{ImageFormat, Rgb, RgbImage};
use relaychat_core::{
    AppConfig, Chat, ConversationCheckpoint, HistoryStore, ModelCatalog, Settings,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

type Seen = Arc<Mutex<Vec<Value>>>;

async fn echo_handler(State(seen): State<Seen>, Json(payload): Json<Value>) -> Json<Value> {
    let turns = payload["messages"].as_array().map_or(0, Vec::len);
    seen.lock().await.push(payload);
    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": format!("seen {turns} messages")}}]
    }))
}

async fn spawn_echo_server(seen: Seen) -> String {
    let app = Router::new()
        .route("/api/v1/chat/completions", post(echo_handler))
        .with_state(seen);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/v1")
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(width, height, Rgb([200, 10, 10]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn full_conversation_round_trip() {
    let dir = TempDir::new().unwrap();
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));

    let mut config = AppConfig::default();
    config.api.base_url = spawn_echo_server(seen.clone()).await;
    config.storage.data_dir = Some(dir.path().to_path_buf());

    let prefs = config.open_preferences().unwrap();
    let settings = Settings::new(prefs.clone());
    settings.set_api_key("sk-or-flow").unwrap();

    let catalog = ModelCatalog::new(prefs.clone());
    let image_model = "google/gemma-3-4b-it:free";
    assert!(catalog.supports_images(image_model));
    settings.set_selected_model(image_model).unwrap();

    let history = HistoryStore::new(prefs.clone());
    let checkpoint = ConversationCheckpoint::new(prefs.clone());
    let mut chat = Chat::new(Arc::new(config.build_client()));

    let request = settings.request_config().unwrap();
    chat.attach_image(png(2048, 1024));
    let first = chat.submit("describe this picture", &request).await.unwrap();
    assert!(first.image_error.is_none());
    assert_eq!(first.reply.text, "seen 1 messages");

    let second = chat.submit("and the colour?", &request).await.unwrap();
    assert_eq!(second.reply.text, "seen 3 messages");

    {
        let payloads = seen.lock().await;
        assert_eq!(payloads[0]["model"], image_model);
        let url = payloads[0]["messages"][0]["content"][0]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert!(url.starts_with("data:image/jpeg;base64,"));
        // Earlier turns go out as text only.
        assert_eq!(
            payloads[1]["messages"][0]["content"],
            json!([{"type": "text", "text": "describe this picture"}])
        );
    }

    let stored_user = chat.conversation().messages().next().unwrap();
    assert!(stored_user.has_image);
    assert!(stored_user.image_data.is_some());

    chat.checkpoint(&checkpoint).unwrap();
    let id = chat
        .start_new(&history, &settings.selected_model())
        .unwrap()
        .unwrap();
    assert!(chat.conversation().is_empty());

    let session = history.get(&id).unwrap();
    assert_eq!(session.title, "Describe this picture");
    assert_eq!(session.messages.len(), 4);
    assert_eq!(session.model_used, image_model);

    let mut restored = Chat::new(Arc::new(config.build_client()));
    restored.restore(&checkpoint);
    assert_eq!(restored.conversation().len(), 4);
}
