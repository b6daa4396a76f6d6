// Tests for rendering inbound chat and transcript lines
//
// A partial line is a sender's in-progress transcript; the sender's next
// line replaces it. Everything else keeps arrival order.

use voicechat::transport::ChatMessage;
use voicechat::ui::MessageList;

fn partial(user: &str, text: &str) -> ChatMessage {
    ChatMessage::new("partial", user, text)
}

fn final_(user: &str, text: &str) -> ChatMessage {
    ChatMessage::new("final", user, text)
}

fn texts(list: &MessageList) -> Vec<String> {
    list.lines().iter().map(|l| l.to_string()).collect()
}

fn partial_count(list: &MessageList, user: &str) -> usize {
    list.lines()
        .iter()
        .filter(|l| l.is_partial() && l.username == user)
        .count()
}

#[test]
fn test_final_replaces_prior_partial() {
    let mut list = MessageList::new();
    list.apply(partial("alice", "hello"));
    list.apply(final_("alice", "hello world"));

    assert_eq!(texts(&list), vec!["alice: hello world"]);
    assert!(list.partial_for("alice").is_none());
}

#[test]
fn test_partials_from_different_users_coexist() {
    let mut list = MessageList::new();
    list.apply(partial("alice", "a"));
    list.apply(partial("bob", "b"));

    assert_eq!(list.len(), 2);
    assert_eq!(list.partial_for("alice").map(|l| l.text.as_str()), Some("a"));
    assert_eq!(list.partial_for("bob").map(|l| l.text.as_str()), Some("b"));
}

#[test]
fn test_final_only_removes_own_partial() {
    let mut list = MessageList::new();
    list.apply(partial("alice", "thinking"));
    list.apply(final_("bob", "done"));

    assert_eq!(texts(&list), vec!["alice: thinking", "bob: done"]);
}

#[test]
fn test_finals_are_never_replaced() {
    let mut list = MessageList::new();
    list.apply(final_("alice", "one"));
    list.apply(final_("alice", "two"));
    list.apply(partial("alice", "thr"));
    list.apply(final_("alice", "three"));

    assert_eq!(texts(&list), vec!["alice: one", "alice: two", "alice: three"]);
}

#[test]
fn test_unknown_kind_renders_as_regular_line() {
    let mut list = MessageList::new();
    list.apply(ChatMessage::new("message", "carol", "hi all"));
    list.apply(partial("carol", "typing"));

    // The regular line survives; only the partial is a placeholder
    list.apply(final_("carol", "typed"));
    assert_eq!(texts(&list), vec!["carol: hi all", "carol: typed"]);
}

#[test]
fn test_at_most_one_partial_per_user_over_sequence() {
    let users = ["alice", "bob", "carol"];
    let mut list = MessageList::new();

    // Deterministic interleaving of partial/final from three users
    for step in 0..90usize {
        let user = users[(step * 7 + step / 5) % users.len()];
        let msg = if step % 4 == 3 {
            final_(user, &format!("final {}", step))
        } else {
            partial(user, &format!("partial {}", step))
        };
        list.apply(msg);

        for u in users {
            assert!(partial_count(&list, u) <= 1, "{} has multiple partials at step {}", u, step);
        }
    }
}

#[test]
fn test_arrival_order_preserved() {
    let mut list = MessageList::new();
    for i in 0..10 {
        let user = if i % 2 == 0 { "alice" } else { "bob" };
        list.apply(final_(user, &format!("m{}", i)));
    }

    let order: Vec<String> = list.lines().iter().map(|l| l.text.clone()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("m{}", i)).collect();
    assert_eq!(order, expected);
}

#[test]
fn test_replacement_moves_line_to_end() {
    let mut list = MessageList::new();
    list.apply(partial("alice", "al"));
    list.apply(final_("bob", "bob's line"));
    let update = list.apply(partial("alice", "alice says"));

    assert_eq!(update.removed_partial, Some(0));
    assert_eq!(update.appended_at, 1);
    assert_eq!(texts(&list), vec!["bob: bob's line", "alice: alice says"]);
    assert_eq!(list.scrolled_to(), Some(1));
}
