// Organizations and membership: creation, invite-code joins, member roles.

pub mod handlers;
