use parley_core::models::message::{ChatTurn, Role};
use parley_llm::tokens::{count, count_turns, MESSAGE_OVERHEAD_TOKENS, REPLY_PRIMING_TOKENS};

#[test]
fn counting_is_deterministic() {
    let text = "The quick brown fox jumps over the lazy dog.";
    assert_eq!(count(text), count(text));
    assert!(count(text) > 0);
}

#[test]
fn empty_text_counts_zero() {
    assert_eq!(count(""), 0);
}

#[test]
fn longer_text_costs_more() {
    let short = "hello";
    let long = "hello hello hello hello hello hello hello hello";
    assert!(count(long) > count(short));
}

#[test]
fn message_list_adds_overhead_and_priming() {
    let turns = vec![
        ChatTurn::new(Role::System, "Be brief"),
        ChatTurn::new(Role::User, "hello there"),
    ];

    let expected: usize = turns
        .iter()
        .map(|t| MESSAGE_OVERHEAD_TOKENS + count(&t.content) + count(t.role.as_str()))
        .sum::<usize>()
        + REPLY_PRIMING_TOKENS;

    assert_eq!(count_turns(&turns), expected);
}

#[test]
fn empty_message_list_costs_only_priming() {
    assert_eq!(count_turns(&[]), REPLY_PRIMING_TOKENS);
}
