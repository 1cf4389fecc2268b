pub mod badge;
pub mod check_in_timer;
pub mod incident;
pub mod incident_helper;
pub mod incident_notification;
pub mod point_award;
pub mod trusted_circle;
pub mod user;
pub mod user_badge;
pub mod user_location;

pub use badge::Entity as Badge;
pub use check_in_timer::Entity as CheckInTimer;
pub use incident::Entity as Incident;
pub use incident_helper::Entity as IncidentHelper;
pub use incident_notification::Entity as IncidentNotification;
pub use point_award::Entity as PointAward;
pub use trusted_circle::Entity as TrustedCircle;
pub use user::Entity as User;
pub use user_badge::Entity as UserBadge;
pub use user_location::Entity as UserLocation;

pub mod prelude;
