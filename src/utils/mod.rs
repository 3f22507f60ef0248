pub mod dates;
pub mod jwt;
pub mod password;
pub mod rating;
