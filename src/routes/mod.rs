pub mod pubsub_routes;
