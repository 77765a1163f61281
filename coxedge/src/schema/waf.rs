//! WAF settings table
//!
//! Each protection section is a block of string toggles. The flag names and
//! their descriptions live in the tables at the bottom of this file; every
//! toggle is an optional string that must parse as a boolean.

use super::{FieldKind, FieldSpec, ResourceSchema, Validation, WAF_SETTINGS};

/// `(attribute name, description)`
type Flag = (&'static str, &'static str);

/// Toggle sections in declaration order, with their descriptions.
pub const SECTIONS: &[(&str, &str, &[Flag])] = &[
    (
        "owasp_threats",
        "Cox's core rule set and OWASP's most critical Web application security risks.",
        OWASP_THREATS,
    ),
    ("general_policies", "General request policies.", GENERAL_POLICIES),
    (
        "traffic_sources",
        "Real-time threat intelligence for IP addresses, source location, and information on malicious IPs.",
        TRAFFIC_SOURCES,
    ),
    (
        "anti_automation_bot_protection",
        "Block automated traffic from scanning and browsing your online application.",
        ANTI_AUTOMATION_BOT_PROTECTION,
    ),
    (
        "behavioral_waf",
        "Cox's sophisticated user behaviour and reputation analysis rules.",
        BEHAVIORAL_WAF,
    ),
    ("cms_protection", "Whitelist admin users.", CMS_PROTECTION),
    ("allow_known_bots", "An object containing known bots.", ALLOW_KNOWN_BOTS),
];

/// Flags of one toggle section.
pub fn section_flags(section: &str) -> Option<&'static [Flag]> {
    SECTIONS
        .iter()
        .find(|(name, _, _)| *name == section)
        .map(|(_, _, flags)| *flags)
}

pub(super) fn waf_settings() -> ResourceSchema {
    let mut fields = vec![
        FieldSpec::new("environment_name", FieldKind::String)
            .required()
            .description("The name of the environment that the site belongs to."),
        FieldSpec::new("site_id", FieldKind::String)
            .required()
            .description("The ID of the site for which the WAF is applied to."),
        FieldSpec::new("stack_id", FieldKind::String)
            .computed()
            .description("The ID of the stack that a site belongs to."),
        FieldSpec::new("domain", FieldKind::String)
            .optional()
            .description("The domain of the site."),
        FieldSpec::new("api_urls", FieldKind::StringList)
            .optional()
            .description("List of configured API urls."),
        FieldSpec::new("ddos_settings", FieldKind::Block(ddos_thresholds()))
            .optional()
            .description("The DDoS Setting containing the different threshold values."),
        toggle("monitoring_mode_enabled", "If the monitoring mode is enabled."),
    ];

    fields.extend(SECTIONS.iter().map(|&(name, description, flags)| {
        let toggles = flags.iter().map(|&(n, d)| toggle(n, d)).collect();
        FieldSpec::new(name, FieldKind::Block(toggles))
            .optional()
            .description(description)
    }));

    ResourceSchema {
        type_name: WAF_SETTINGS,
        description: "Manages the web application firewall settings of a site",
        fields,
    }
}

fn ddos_thresholds() -> Vec<FieldSpec> {
    [
        (
            "global_threshold",
            "The number of overall requests per ten seconds that can trigger DDoS protection.",
        ),
        (
            "burst_threshold",
            "The number of requests per two seconds that can trigger DDoS protection.",
        ),
        (
            "subsecond_burst_threshold",
            "The number of requests per 0.1 seconds that can trigger DDoS protection.",
        ),
    ]
    .into_iter()
    .map(|(name, description)| {
        FieldSpec::new(name, FieldKind::Int)
            .required()
            .description(description)
            .validation(Validation::Positive)
    })
    .collect()
}

fn toggle(name: &'static str, description: &'static str) -> FieldSpec {
    FieldSpec::new(name, FieldKind::String)
        .optional()
        .description(description)
        .validation(Validation::BoolString)
}

const OWASP_THREATS: &[Flag] = &[
    ("sql_injection", "Block requests suspected of being a SQL injection attack attempt."),
    ("xss_attack", "Block requests suspected of being a Cross-Site-Scripting attack attempt."),
    ("shell_shock_attack", "Block requests suspected of being a Shellshock attack attempt."),
    ("remote_file_inclusion", "Block requests suspected of being a Remote File Inclusion attempt."),
    ("apache_struts_exploit", "Patch known vulnerabilities in the Apache Struts framework by blocking requests suspected of exploiting these vulnerabilities."),
    ("local_file_inclusion", "Block requests suspected of a Local File Inclusion attempt."),
    ("common_web_application_vulnerabilities", "Block attempts to access and potentially harm your servers through common backdoors, such as common control panels, configuration scripts etc."),
    ("webshell_execution_attempt", "Block requests suspected of Web shell attempts."),
    ("protocol_attack", ""),
    ("csrf", "Cox WAF will generate a CSRF token that is added to forms."),
    ("open_redirect", "Block requests suspected of being an Open Redirect attempt."),
    ("shell_injection", "Block requests suspected of being a shell injection attack attempt."),
    ("code_injection", ""),
    ("sensitive_data_exposure", ""),
    ("xml_external_entity", ""),
    ("personal_identifiable_info", ""),
    ("serverside_template_injection", ""),
];

const GENERAL_POLICIES: &[Flag] = &[
    ("block_invalid_user_agents", ""),
    ("block_unknown_user_agents", ""),
    ("http_method_validation", ""),
];

const TRAFFIC_SOURCES: &[Flag] = &[
    ("via_tor_nodes", "Challenge traffic from The Onion Ring exit nodes to block bots and known bad devices."),
    ("via_proxy_networks", "Challenge traffic from any known proxy network to block bots and known bad devices."),
    ("via_hosting_services", "Challenge traffic from IP addresses known to be of hosting service companies."),
    ("via_vpn", "Challenge traffic from any known VPN to block bots and known bad devices."),
    ("convicted_bot_traffic", "Challenge traffic from IP addresses that have been convicted of automated activities (bots) on this site or on others."),
    ("traffic_from_suspicious_nat_ranges", "Challenge traffic from suspicious NAT ranges."),
    ("external_reputation_block_list", ""),
    ("traffic_via_cdn", ""),
];

const ANTI_AUTOMATION_BOT_PROTECTION: &[Flag] = &[
    ("force_browser_validation_on_traffic_anomalies", "Challenge and block requests if the user or device behind them does not keep session cookies and does not execute JavaScripts correctly."),
    ("challenge_automated_clients", "Captcha-challenge and block sessions conducted by standard Web browsers if there is evidence that these sessions are being automated and not driven by a human user."),
    ("challenge_headless_browsers", "Challenge requests if the user or device behind them uses an automation tool that initiates browsers but is actually an automation tool without real display, such as phantomJS, Selenium, or other."),
    ("anti_scraping", "A more hardened anti-automation policy that is meant to stop scrapers by using faster and harsher convictions."),
];

const BEHAVIORAL_WAF: &[Flag] = &[
    ("spam_protection", "Challenge and block user sessions and activities that seem to be aggressively using forms on your website to post spam content, generate new accounts, and more."),
    ("block_probing_and_forced_browsing", "Challenge or block sessions and users that seem to make brute-forced requests on random URLs seeking to discover a Web application's structure and hidden directories."),
    ("obfuscated_attacks_and_zeroday_mitigation", "Block clients performing multiple injection attacks."),
    ("repeated_violations", "Challenge or block clients that failed to answer previous challenges."),
    ("bruteforce_protection", "Challenge and block attempts seeking to guess user names and passwords on Web login forms."),
];

const CMS_PROTECTION: &[Flag] = &[
    ("wordpress_waf_ruleset", ""),
    ("whitelist_wordpress", "Enable whitelist WordPress admin logged-in users."),
    ("whitelist_modx", "Enable whitelist MODX admin logged-in users."),
    ("whitelist_drupal", "Enable whitelist Drupal admin logged-in users."),
    ("whitelist_joomla", "Enable whitelist Joomla admin logged-in users."),
    ("whitelist_magento", "Enable whitelist Magento admin logged-in users."),
    ("whitelist_origin_ip", "Enable this policy to whitelist requests coming from the origin for plugin updates and general CMS updates"),
    ("whitelist_umbraco", "Enable whitelist Umbraco admin logged-in users."),
];

const ALLOW_KNOWN_BOTS: &[Flag] = &[
    ("acquia_uptime", ""),
    ("add_search_bot", ""),
    ("adestra_bot", ""),
    ("adjust_servers", ""),
    ("ahrefs_bot", ""),
    ("alerta_bot", ""),
    ("alexa_ia_archiver", ""),
    ("alexa_technologies", ""),
    ("amazon_route_53_health_check_service", ""),
    ("applebot", ""),
    ("apple_news_bot", ""),
    ("ask_jeeves_bot", ""),
    ("audisto_bot", ""),
    ("baidu_spider_bot", ""),
    ("baidu_spider_japan_bot", ""),
    ("binary_canary", ""),
    ("bitbucket_webhook", ""),
    ("blekko_scout_jet_bot", ""),
    ("chrome_compression_proxy", ""),
    ("coccocbot", ""),
    ("cookie_bot", ""),
    ("cybersource", ""),
    ("daumoa_bot", ""),
    ("detectify_scanner", ""),
    ("digi_cert_dcv_bot", ""),
    ("dotmic_dot_bot_commercial", ""),
    ("duck_duck_go_bot", ""),
    ("facebook_external_hit_bot", ""),
    ("feeder_co", ""),
    ("feed_press", ""),
    ("feed_wind", ""),
    ("freshping_monitoring", ""),
    ("geckoboard", ""),
    ("ghost_inspector", ""),
    ("gomez", ""),
    ("goo_japan_bot", ""),
    ("google_ads_bot", ""),
    ("google_bot", ""),
    ("google_cloud_monitoring_bot", ""),
    ("google_feed_fetcher_bot", ""),
    ("google_image_bot", ""),
    ("google_image_proxy", ""),
    ("google_mediapartners_bot", ""),
    ("google_mobile_ads_bot", ""),
    ("google_news_bot", ""),
    ("google_page_speed_insights", ""),
    ("google_structured_data_testing_tool", ""),
    ("google_verification_bot", ""),
    ("google_video_bot", ""),
    ("google_web_light", ""),
    ("grapeshot_bot_commercial", ""),
    ("gree_japan_bot", ""),
    ("hetrix_tools", ""),
    ("hi_pay", ""),
    ("hyperspin_bot", ""),
    ("ias_crawler_commercial", ""),
    ("internet_archive_bot", ""),
    ("jetpack_bot", ""),
    ("jike_spider_bot", ""),
    ("j_word_japan_bot", ""),
    ("kakao_user_agent", ""),
    ("kyoto_tohoku_crawler", ""),
    ("landau_media_spider", ""),
    ("lets_encrypt", ""),
    ("line_japan_bot", ""),
    ("linked_in_bot", ""),
    ("livedoor_japan_bot", ""),
    ("mail_ru_bot", ""),
    ("manage_wp", ""),
    ("microsoft_bing_bot", ""),
    ("microsoft_bing_preview_bot", ""),
    ("microsoft_msn_bot", ""),
    ("microsoft_skype_bot", ""),
    ("mixi_japan_bot", ""),
    ("mobage_japan_bot", ""),
    ("naver_yeti_bot", ""),
    ("new_relic_bot", ""),
    ("ocn_japan_bot", ""),
    ("panopta_bot", ""),
    ("parse_ly_scraper", ""),
    ("pay_pal_ipn", ""),
    ("petal_bot", ""),
    ("pingdom", ""),
    ("pinterest_bot", ""),
    ("qwantify_bot", ""),
    ("roger_bot", ""),
    ("sage_pay", ""),
    ("sectigo_bot", ""),
    ("semrush_bot", ""),
    ("server_density_service_monitoring_bot", ""),
    ("seznam_bot", ""),
    ("shareaholic_bot", ""),
    ("site_24_x_7_bot", ""),
    ("siteimprove_bot", ""),
    ("site_lock_spider", ""),
    ("slack_bot", ""),
    ("sogou_bot", ""),
    ("soso_spider_bot", ""),
    ("spatineo", ""),
    ("spring_bot", ""),
    ("stackify", ""),
    ("status_cake_bot", ""),
    ("stripe", ""),
    ("sucuri_uptime_monitor_bot", ""),
    ("telegram_bot", ""),
    ("testomato_bot", ""),
    ("the_find_crawler", ""),
    ("twitter_bot", ""),
    ("uptime_robot", ""),
    ("vkontakte_external_hit_bot", ""),
    ("w_3_c", ""),
    ("wordfence_central", ""),
    ("workato", ""),
    ("xml_sitemaps", ""),
    ("yahoo_inktomi_slurp_bot", ""),
    ("yahoo_japan_bot", ""),
    ("yahoo_link_preview", ""),
    ("yahoo_seeker_bot", ""),
    ("yahoo_slurp_bot", ""),
    ("yandex_bot", ""),
    ("yisou_spider_commercial", ""),
    ("yodao_bot", ""),
    ("zendesk_bot", ""),
    ("zoho_bot", ""),
    ("zum_bot", ""),
];
