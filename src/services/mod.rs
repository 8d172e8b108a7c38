pub mod nlu;
pub mod places;
pub mod weather;
pub mod wiki;

pub use nlu::{NluClient, TextAnalyzer};
pub use places::PlacesClient;
pub use weather::WeatherClient;
pub use wiki::{WikiArticle, WikiClient};
