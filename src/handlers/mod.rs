// One module per resource family. Every handler follows the same contract:
// check the permission on the request context, scope the query by tenant,
// return the envelope (or an ApiError that renders one).

pub mod announcements;
pub mod auth;
pub mod books;
pub mod classes;
pub mod examinations;
pub mod expenses;
pub mod health;
pub mod hostels;
pub mod invoices;
pub mod leave;
pub mod messages;
pub mod roles;
pub mod staff;
pub mod students;
