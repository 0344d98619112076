pub mod cart_session;
