//! User-facing reply texts.

/// Sent after a chat has been added as a subscriber.
pub const SUBSCRIBED: &str = "Successfully subscribed.";

/// Sent when a subscribing chat is already on the list.
pub const ALREADY_SUBSCRIBED: &str = "This chat already subscribed.";

/// Sent when the subscriber store could not add the chat.
pub const SUBSCRIBE_FAILED: &str = "Failed to subscribe. Try again later.";

/// Sent when the provided subscription key does not match.
pub const SUBSCRIBE_INVALID_KEY: &str = "Failed to subscribe. Invalid subscription key.";

/// Asks the user for the subscription key (sent with a force-reply markup).
pub const SUBSCRIPTION_KEY_REQUEST: &str = "Provide the subscription key in the reply message to complete the process.";

/// Sent after a chat has been removed from the subscribers.
pub const UNSUBSCRIBED: &str = "Successfully unsubscribed.";

/// Sent when an unsubscribing chat is not on the list.
pub const NOT_SUBSCRIBED: &str = "This chat is not yet subscribed.";

/// Sent when the subscriber store could not remove the chat.
pub const UNSUBSCRIBE_FAILED: &str = "Failed to unsubscribe. Try again later.";

/// Sent for any command the bot does not know.
pub const UNSUPPORTED_COMMAND: &str = "Command is not supported.";

/// Default notification text for new Rocket.Chat activity.
pub const DEFAULT_NOTIFICATION: &str = "New Rocket.Chat message received";

/// Greeting sent in response to `/start`.
pub fn greeting(display_name: &str) -> String {
    if display_name.is_empty() {
        "Hello there! Send /help to see what I can do.".to_string()
    } else {
        format!("Hello there, dear {display_name}! Send /help to see what I can do.")
    }
}
