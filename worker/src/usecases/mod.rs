pub mod dispatch_due_messages;
