mod client_ops;
mod subscriptions;
