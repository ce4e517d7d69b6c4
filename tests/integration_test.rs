mod branch_routing;
mod notifications;
