// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/// Prioritized candidates for the port scanning technique: common service
/// prefixes first, then the security-relevant ones attackers go for.
pub const PORT_SCAN_CANDIDATES: &[&str] = &[
    "www", "api", "mail", "app", "portal", "shop", "blog", "cdn", "static",
    "admin", "audit", "auth", "login", "secure", "vpn", "internal", "staging",
    "dev", "test", "backup", "db", "grafana", "jenkins", "git",
];

/// Wordlist for the DNS brute force envelope
pub const DNS_WORDLIST: &[&str] = &[
    "www", "api", "admin", "dev", "staging", "test", "qa", "uat",
    "mail", "smtp", "pop", "imap", "webmail",
    "ftp", "sftp", "ssh",
    "vpn", "remote", "access",
    "blog", "forum", "shop", "store",
    "cdn", "static", "assets", "media", "images",
    "m", "mobile", "app",
    "portal", "dashboard", "panel",
    "beta", "alpha", "demo",
    "git", "gitlab", "jenkins", "ci",
    "jira", "confluence", "wiki",
    "status", "monitor", "metrics",
    "db", "database", "mysql", "postgres", "mongo",
    "cache", "redis",
    "backup", "backups",
    "old", "new", "legacy",
    "v1", "v2", "api-v1", "api-v2",
    "ws", "graphql", "rest",
    "docs", "help", "support",
    "secure", "login", "auth", "oauth",
    "payment", "pay", "checkout",
    "internal", "corp", "intranet",
];

/// Extension of the brute force wordlist used in exhaustive mode
pub const DNS_WORDLIST_EXTENDED: &[&str] = &[
    "autodiscover", "autoconfig", "cpanel", "whm", "plesk",
    "webdisk", "email", "mx", "ns1", "ns2", "ns3",
    "files", "download", "upload",
    "ssl", "tls",
    "test1", "test2", "dev1", "dev2",
    "stage", "staging1", "staging2",
    "prod", "production",
    "lb", "loadbalancer",
    "proxy", "gateway",
    "cdn1", "cdn2", "static1", "static2",
    "img", "video", "stream",
    "chat", "crm", "erp", "hr",
    "finance", "accounting",
    "reports", "analytics", "stats",
    "logging", "logs", "syslog",
    "sandbox", "preview", "preprod",
    "build", "release",
];

/// Mail-related prefixes promoted to the front of the brute force
/// ordering when root TXT records carry SPF/DKIM/DMARC markers
pub const MAIL_PREFIXES: &[&str] = &["mail", "smtp", "webmail", "imap", "pop", "mx"];

/// Essential prefixes checked directly through the HTTP existence probe
pub const ESSENTIAL_SUBDOMAINS: &[&str] = &[
    "www", "api", "app", "admin", "portal", "dashboard", "mail", "blog",
    "docs", "status", "staging", "dev",
];

/// Common API paths exercised by the authenticated access probe
pub const COMMON_API_PATHS: &[&str] = &[
    "/api/user", "/api/users", "/api/me", "/api/profile", "/api/account",
    "/api/settings", "/api/admin", "/api/v1/user", "/api/v1/me",
    "/api/orders", "/api/billing", "/api/keys",
];
