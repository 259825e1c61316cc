pub mod pairing_request;
