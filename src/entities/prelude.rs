pub use super::badge::Entity as Badge;
pub use super::check_in_timer::Entity as CheckInTimer;
pub use super::incident::Entity as Incident;
pub use super::incident_helper::Entity as IncidentHelper;
pub use super::incident_notification::Entity as IncidentNotification;
pub use super::point_award::Entity as PointAward;
pub use super::trusted_circle::Entity as TrustedCircle;
pub use super::user::Entity as User;
pub use super::user_badge::Entity as UserBadge;
pub use super::user_location::Entity as UserLocation;
