mod common;

use nudge::{
    conversations::ChatMessage,
    realtime::{
        relay_private_message, Delivery, OutboundEvent, PrivateMessage, SOCKET_CHAT_NEW_PRIVATE_MESSAGE,
        SOCKET_CHAT_SET_ONLINE, SOCKET_EMIT_NOTIFICATION_POST_LIKED,
    },
};
use serde_json::json;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use common::{state_with, user};

fn drain(rx: &mut UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_deliver_to_online_user() {
    let alice = user("alice");
    let state = state_with(&[&alice]).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = state.presence.on_connect(tx).await;
    assert!(state.presence.on_authenticate(conn, &alice).await.unwrap());

    let delivery = state
        .dispatcher
        .deliver(SOCKET_EMIT_NOTIFICATION_POST_LIKED, json!({ "id": "p1" }), &alice.mini())
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Sent(conn));

    let events = drain(&mut rx);
    assert_eq!(events, [OutboundEvent::new(SOCKET_EMIT_NOTIFICATION_POST_LIKED, json!({ "id": "p1" }))]);

    let stored = state.graph.user(&alice.id).await.unwrap().unwrap();
    assert!(stored.new_notification.is_none());
}

#[tokio::test]
async fn test_offline_deliveries_overwrite_and_arrive_once() {
    let alice = user("alice");
    let state = state_with(&[&alice]).await;

    for n in 1..=2 {
        let delivery = state
            .dispatcher
            .deliver(SOCKET_EMIT_NOTIFICATION_POST_LIKED, json!({ "n": n }), &alice.mini())
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Pending);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = state.presence.on_connect(tx).await;
    state.presence.on_authenticate(conn, &alice).await.unwrap();

    // Only the last write survives.
    assert_eq!(drain(&mut rx), [OutboundEvent::new(SOCKET_EMIT_NOTIFICATION_POST_LIKED, json!({ "n": 2 }))]);
    assert!(state.graph.take_pending(&alice.id).await.unwrap().is_none());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let again = state.presence.on_connect(tx).await;
    state.presence.on_authenticate(again, &alice).await.unwrap();
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn test_presence_broadcasts() {
    let alice = user("alice");
    let bob = user("bob");
    let state = state_with(&[&alice, &bob]).await;

    let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
    let alice_conn = state.presence.on_connect(alice_tx).await;
    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    let bob_conn = state.presence.on_connect(bob_tx).await;
    let (anon_tx, mut anon_rx) = mpsc::unbounded_channel();
    state.presence.on_connect(anon_tx).await;

    state.presence.on_authenticate(alice_conn, &alice).await.unwrap();
    assert!(drain(&mut alice_rx).is_empty());

    let online = OutboundEvent::new(
        SOCKET_CHAT_SET_ONLINE,
        json!({ "notification": true, "username": "alice", "isOnline": true }),
    );
    assert_eq!(drain(&mut bob_rx), [online.clone()]);
    assert_eq!(drain(&mut anon_rx), [online]);

    state.presence.on_authenticate(bob_conn, &bob).await.unwrap();
    drain(&mut alice_rx);
    drain(&mut anon_rx);

    let mut active: Vec<_> = state.presence.list_active().await.into_iter().map(|c| c.entry.username).collect();
    active.sort();
    assert_eq!(active, ["alice", "bob"]);

    let entry = state.presence.on_logout(bob_conn).await.unwrap();
    assert_eq!(entry.username, "bob");
    let offline = OutboundEvent::new(
        SOCKET_CHAT_SET_ONLINE,
        json!({ "notification": true, "username": "bob", "isOnline": false }),
    );
    assert_eq!(drain(&mut alice_rx), [offline.clone()]);
    assert_eq!(drain(&mut anon_rx), [offline]);
    assert!(drain(&mut bob_rx).is_empty());
    assert_eq!(state.presence.list_active().await.len(), 1);

    // Disconnect is silent.
    state.presence.on_disconnect(alice_conn).await;
    assert!(drain(&mut anon_rx).is_empty());
    assert!(state.presence.find_by_username("alice").await.is_none());
}

#[tokio::test]
async fn test_broadcast_except_skips_the_actor() {
    let alice = user("alice");
    let bob = user("bob");
    let state = state_with(&[&alice, &bob]).await;

    let (alice_tx, mut alice_rx) = mpsc::unbounded_channel();
    let alice_conn = state.presence.on_connect(alice_tx).await;
    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    let bob_conn = state.presence.on_connect(bob_tx).await;
    state.presence.on_authenticate(alice_conn, &alice).await.unwrap();
    state.presence.on_authenticate(bob_conn, &bob).await.unwrap();
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    let sent = state.dispatcher.broadcast_except("ping", json!(null), &alice.id).await;
    assert_eq!(sent, 1);
    assert!(drain(&mut alice_rx).is_empty());
    assert_eq!(drain(&mut bob_rx).len(), 1);

    assert_eq!(state.dispatcher.broadcast("ping", json!(null)).await, 2);
}

#[tokio::test]
async fn test_self_actions_notify_nobody() {
    let alice = user("alice");
    let state = state_with(&[&alice]).await;

    let delivery = state
        .dispatcher
        .notify_unless_self(SOCKET_EMIT_NOTIFICATION_POST_LIKED, json!({}), &alice.mini(), &alice.id)
        .await;
    assert!(delivery.is_none());
    let stored = state.graph.user(&alice.id).await.unwrap().unwrap();
    assert!(stored.new_notification.is_none());
}

#[tokio::test]
async fn test_dropped_receiver_falls_back_to_pending() {
    let alice = user("alice");
    let state = state_with(&[&alice]).await;

    let (tx, rx) = mpsc::unbounded_channel();
    let conn = state.presence.on_connect(tx).await;
    state.presence.on_authenticate(conn, &alice).await.unwrap();
    drop(rx);

    let delivery = state
        .dispatcher
        .deliver(SOCKET_EMIT_NOTIFICATION_POST_LIKED, json!({ "id": "p1" }), &alice.mini())
        .await
        .unwrap();
    assert_eq!(delivery, Delivery::Pending);
}

#[tokio::test]
async fn test_private_message_is_relayed_and_saved() {
    let alice = user("alice");
    let bob = user("bob");
    let state = state_with(&[&alice, &bob]).await;
    let conversation = state.conversations.create(alice.mini(), bob.mini()).await.unwrap();

    let (alice_tx, _alice_rx) = mpsc::unbounded_channel();
    let alice_conn = state.presence.on_connect(alice_tx).await;
    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    let bob_conn = state.presence.on_connect(bob_tx).await;
    state.presence.on_authenticate(alice_conn, &alice).await.unwrap();
    state.presence.on_authenticate(bob_conn, &bob).await.unwrap();
    drain(&mut bob_rx);

    let from = state.presence.entry(alice_conn).await.unwrap();
    let message = relay_private_message(
        &state.presence,
        &state.conversations,
        &from,
        PrivateMessage {
            conversation_id: conversation.id,
            to: "bob".into(),
            txt: "hi bob".into(),
        },
    )
    .await
    .unwrap();
    assert_eq!(message.from, "alice");
    assert_eq!(message.id.len(), 6);

    let events = drain(&mut bob_rx);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, SOCKET_CHAT_NEW_PRIVATE_MESSAGE);
    let relayed: ChatMessage = serde_json::from_value(events[0].data.clone()).unwrap();
    assert_eq!(relayed, message);

    let saved = state.conversations.get(&conversation.id).await.unwrap().unwrap();
    assert_eq!(saved.messages, [message]);
    assert!(matches!(bob_rx.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_logging_out_a_user_unbinds_all_their_sockets() {
    let alice = user("alice");
    let bob = user("bob");
    let state = state_with(&[&alice, &bob]).await;

    let (phone_tx, mut phone_rx) = mpsc::unbounded_channel();
    let phone = state.presence.on_connect(phone_tx).await;
    let (laptop_tx, mut laptop_rx) = mpsc::unbounded_channel();
    let laptop = state.presence.on_connect(laptop_tx).await;
    let (bob_tx, mut bob_rx) = mpsc::unbounded_channel();
    let bob_conn = state.presence.on_connect(bob_tx).await;
    state.presence.on_authenticate(phone, &alice).await.unwrap();
    state.presence.on_authenticate(laptop, &alice).await.unwrap();
    state.presence.on_authenticate(bob_conn, &bob).await.unwrap();
    drain(&mut phone_rx);
    drain(&mut laptop_rx);
    drain(&mut bob_rx);

    assert_eq!(state.presence.logout_user(&alice.id).await, 2);

    let offline = OutboundEvent::new(
        SOCKET_CHAT_SET_ONLINE,
        json!({ "notification": true, "username": "alice", "isOnline": false }),
    );
    assert_eq!(drain(&mut bob_rx), [offline.clone(), offline]);
    let active: Vec<_> = state.presence.list_active().await.into_iter().map(|c| c.entry.username).collect();
    assert_eq!(active, ["bob"]);
    assert!(state.presence.find_by_username("alice").await.is_none());

    // Nothing left to log out.
    assert_eq!(state.presence.logout_user(&alice.id).await, 0);
}
