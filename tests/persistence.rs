//! Integration tests for on-disk persistence across store re-opens.

use agent_tui::store::{ConversationStore, DEFAULT_LIST_LIMIT, Role};

#[tokio::test]
async fn history_survives_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("chat.db");

    let conversation_id = {
        let store = ConversationStore::open(&db_path).await.unwrap();
        let id = store
            .create_conversation(
                "user_alice",
                "tui-session",
                serde_json::json!({"source": "terminal"}),
            )
            .await
            .unwrap();
        store
            .add_message(&id, "user_alice", Role::User, "hi", None)
            .await
            .unwrap();
        store
            .add_message(&id, "user_alice", Role::Assistant, "hello", None)
            .await
            .unwrap();
        store.close();
        id
    };

    // Re-open and verify everything came back.
    let store = ConversationStore::open(&db_path).await.unwrap();
    let conversation = store
        .get_conversation(&conversation_id)
        .await
        .unwrap()
        .expect("conversation should survive reopen");
    assert_eq!(conversation.user_id, "user_alice");
    assert_eq!(conversation.metadata["source"], "terminal");

    let messages = store.conversation_messages(&conversation_id).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "hi");
    assert_eq!(messages[1].content, "hello");

    let listed = store
        .list_conversations("user_alice", DEFAULT_LIST_LIMIT)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn delete_persists_across_reopen() {
    let tmp = tempfile::tempdir().unwrap();
    let db_path = tmp.path().join("chat.db");

    let store = ConversationStore::open(&db_path).await.unwrap();
    let id = store
        .create_conversation("user_alice", "default", serde_json::json!({}))
        .await
        .unwrap();
    store
        .add_message(&id, "user_alice", Role::User, "hi", None)
        .await
        .unwrap();
    store.delete_conversation(&id).await.unwrap();
    store.close();

    let store = ConversationStore::open(&db_path).await.unwrap();
    assert!(store.get_conversation(&id).await.unwrap().is_none());
    assert!(store.conversation_messages(&id).await.unwrap().is_empty());
}
