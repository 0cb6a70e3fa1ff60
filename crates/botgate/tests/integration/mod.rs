mod messages;
mod scenarios;
