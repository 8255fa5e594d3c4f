mod user;
mod deal;
mod investment;
mod meeting;
pub mod dashboard;

pub use user::{
    InvestorAccount, ProfileColumns, Role, RoleProfile, StartupAccount, UpdateInvestorProfile,
    UpdateStartupProfile, User, UserRow, UserView, ProfileDetails,
};
pub use deal::{CreateDeal, Deal, DealAction, DealRow, DealStatus, UpdateDeal};
pub use investment::{CreateInvestment, Investment};
pub use meeting::{Meeting, ScheduleMeeting, DEFAULT_MEETING_TITLE};
