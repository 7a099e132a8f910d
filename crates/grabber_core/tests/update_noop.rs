use grabber_core::{update, Msg, QueueState};

#[test]
fn update_is_noop() {
    let state = QueueState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}
