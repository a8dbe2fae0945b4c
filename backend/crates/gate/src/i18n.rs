//! User-Facing Message Catalogs
//!
//! Static phrase tables for the translated error/message surface. Upstream
//! error detail is logged server-side; clients only ever see these phrases.

/// Supported interface languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Zh,
    Fr,
    It,
    Ja,
    De,
    Ko,
}

impl Lang {
    pub fn parse(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "en" => Some(Lang::En),
            "zh" => Some(Lang::Zh),
            "fr" => Some(Lang::Fr),
            "it" => Some(Lang::It),
            "ja" => Some(Lang::Ja),
            "de" => Some(Lang::De),
            "ko" => Some(Lang::Ko),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Zh => "zh",
            Lang::Fr => "fr",
            Lang::It => "it",
            Lang::Ja => "ja",
            Lang::De => "de",
            Lang::Ko => "ko",
        }
    }

    /// Pick a language from an `Accept-Language` header, falling back to
    /// the configured default. Only the primary subtag of the first
    /// recognized tag is considered.
    pub fn from_accept_language(header: &str, fallback: Lang) -> Lang {
        for part in header.split(',') {
            let tag = part.split(';').next().unwrap_or("").trim();
            let primary = tag.split('-').next().unwrap_or("");
            if let Some(lang) = Lang::parse(primary) {
                return lang;
            }
        }
        fallback
    }
}

/// The phrase table for one language.
#[derive(Debug)]
pub struct Catalog {
    pub login_required: &'static str,
    pub invalid_credentials: &'static str,
    pub user_not_found: &'static str,
    pub step_up_required: &'static str,
    pub code_sent: &'static str,
    pub broker_unavailable: &'static str,
    pub totp_fallback_hint: &'static str,
    pub rate_limited: &'static str,
    pub invalid_request: &'static str,
    pub internal_error: &'static str,
    pub logged_out: &'static str,
}

static EN: Catalog = Catalog {
    login_required: "Authentication required",
    invalid_credentials: "Invalid credentials",
    user_not_found: "User not found or not allowed",
    step_up_required: "Additional verification required",
    code_sent: "Verification code sent",
    broker_unavailable: "Verification service temporarily unavailable",
    totp_fallback_hint: "You can also sign in with an authenticator code",
    rate_limited: "Too many attempts, please try again later",
    invalid_request: "Invalid request",
    internal_error: "Internal server error",
    logged_out: "Logged out",
};

static ZH: Catalog = Catalog {
    login_required: "需要登录认证",
    invalid_credentials: "凭证无效",
    user_not_found: "用户不存在或不允许访问",
    step_up_required: "需要额外验证",
    code_sent: "验证码已发送",
    broker_unavailable: "验证服务暂时不可用",
    totp_fallback_hint: "您也可以使用动态口令登录",
    rate_limited: "尝试次数过多，请稍后再试",
    invalid_request: "无效的请求",
    internal_error: "服务器内部错误",
    logged_out: "已退出登录",
};

static FR: Catalog = Catalog {
    login_required: "Authentification requise",
    invalid_credentials: "Identifiants invalides",
    user_not_found: "Utilisateur introuvable ou non autorisé",
    step_up_required: "Vérification supplémentaire requise",
    code_sent: "Code de vérification envoyé",
    broker_unavailable: "Service de vérification temporairement indisponible",
    totp_fallback_hint: "Vous pouvez aussi vous connecter avec un code d'authentification",
    rate_limited: "Trop de tentatives, veuillez réessayer plus tard",
    invalid_request: "Requête invalide",
    internal_error: "Erreur interne du serveur",
    logged_out: "Déconnecté",
};

static IT: Catalog = Catalog {
    login_required: "Autenticazione richiesta",
    invalid_credentials: "Credenziali non valide",
    user_not_found: "Utente non trovato o non autorizzato",
    step_up_required: "Verifica aggiuntiva richiesta",
    code_sent: "Codice di verifica inviato",
    broker_unavailable: "Servizio di verifica temporaneamente non disponibile",
    totp_fallback_hint: "Puoi anche accedere con un codice dell'authenticator",
    rate_limited: "Troppi tentativi, riprova più tardi",
    invalid_request: "Richiesta non valida",
    internal_error: "Errore interno del server",
    logged_out: "Disconnesso",
};

static JA: Catalog = Catalog {
    login_required: "認証が必要です",
    invalid_credentials: "認証情報が無効です",
    user_not_found: "ユーザーが見つからないか許可されていません",
    step_up_required: "追加の確認が必要です",
    code_sent: "確認コードを送信しました",
    broker_unavailable: "確認サービスは一時的に利用できません",
    totp_fallback_hint: "認証アプリのコードでもサインインできます",
    rate_limited: "試行回数が多すぎます。しばらくしてからお試しください",
    invalid_request: "不正なリクエストです",
    internal_error: "サーバー内部エラー",
    logged_out: "ログアウトしました",
};

static DE: Catalog = Catalog {
    login_required: "Authentifizierung erforderlich",
    invalid_credentials: "Ungültige Anmeldedaten",
    user_not_found: "Benutzer nicht gefunden oder nicht zugelassen",
    step_up_required: "Zusätzliche Verifizierung erforderlich",
    code_sent: "Bestätigungscode gesendet",
    broker_unavailable: "Verifizierungsdienst vorübergehend nicht verfügbar",
    totp_fallback_hint: "Sie können sich auch mit einem Authenticator-Code anmelden",
    rate_limited: "Zu viele Versuche, bitte später erneut versuchen",
    invalid_request: "Ungültige Anfrage",
    internal_error: "Interner Serverfehler",
    logged_out: "Abgemeldet",
};

static KO: Catalog = Catalog {
    login_required: "인증이 필요합니다",
    invalid_credentials: "잘못된 인증 정보입니다",
    user_not_found: "사용자를 찾을 수 없거나 허용되지 않습니다",
    step_up_required: "추가 인증이 필요합니다",
    code_sent: "인증 코드가 전송되었습니다",
    broker_unavailable: "인증 서비스를 일시적으로 사용할 수 없습니다",
    totp_fallback_hint: "인증 앱 코드로도 로그인할 수 있습니다",
    rate_limited: "시도 횟수가 너무 많습니다. 나중에 다시 시도하세요",
    invalid_request: "잘못된 요청입니다",
    internal_error: "서버 내부 오류",
    logged_out: "로그아웃되었습니다",
};

/// Phrase table for a language.
pub fn catalog(lang: Lang) -> &'static Catalog {
    match lang {
        Lang::En => &EN,
        Lang::Zh => &ZH,
        Lang::Fr => &FR,
        Lang::It => &IT,
        Lang::Ja => &JA,
        Lang::De => &DE,
        Lang::Ko => &KO,
    }
}
