//! Templates for the configuration files written by the contributor.

use indoc::formatdoc;
use std::path::Path;

/// Address PHP-FPM listens on and the webservers forward PHP requests to.
pub(crate) const PHP_FPM_LISTEN: &str = "127.0.0.1:9000";

pub(crate) fn php_ini(app_root: &Path, lib_dir: &str, extension_dir: Option<&Path>) -> String {
    let include_path = app_root.join(lib_dir);
    let extension_dir = extension_dir
        .map(|extension_dir| format!("extension_dir = \"{}\"\n", extension_dir.display()))
        .unwrap_or_default();

    formatdoc! {r#"
        [PHP]
        engine = On
        short_open_tag = Off
        precision = 14
        output_buffering = 4096
        zlib.output_compression = Off
        implicit_flush = Off
        serialize_precision = -1
        zend.enable_gc = On
        expose_php = Off
        max_execution_time = 30
        max_input_time = 60
        memory_limit = 128M
        error_reporting = E_ALL & ~E_DEPRECATED & ~E_STRICT
        display_errors = Off
        display_startup_errors = Off
        log_errors = On
        error_log = /dev/stderr
        variables_order = "EGPCS"
        request_order = "GP"
        register_argc_argv = Off
        auto_globals_jit = On
        post_max_size = 8M
        default_mimetype = "text/html"
        default_charset = "UTF-8"
        include_path = ".:/usr/share/php:{include_path}"
        {extension_dir}enable_dl = Off
        file_uploads = On
        upload_max_filesize = 2M
        max_file_uploads = 20
        allow_url_fopen = On
        allow_url_include = Off
        default_socket_timeout = 60

        [Date]
        date.timezone = UTC

        [Session]
        session.save_handler = files
        session.save_path = "/tmp"
        session.use_strict_mode = 0
        session.use_cookies = 1
        session.use_only_cookies = 1
        session.name = PHPSESSID
        session.cookie_httponly = 1
        session.gc_maxlifetime = 1440
    "#, include_path = include_path.display()}
}

pub(crate) fn php_fpm_conf(layer_dir: &Path, user_include: Option<&Path>) -> String {
    let mut conf = formatdoc! {"
        [global]
        pid = {pid}
        error_log = /proc/self/fd/2
        daemonize = no

        [www]
        listen = {PHP_FPM_LISTEN}
        pm = dynamic
        pm.max_children = 5
        pm.start_servers = 2
        pm.min_spare_servers = 1
        pm.max_spare_servers = 3
        clear_env = no
        catch_workers_output = yes
        decorate_workers_output = no
    ", pid = layer_dir.join("php-fpm.pid").display()};

    if let Some(user_include) = user_include {
        conf.push_str(&format!("\ninclude={}\n", user_include.display()));
    }

    conf
}

pub(crate) fn httpd_conf(document_root: &Path, server_admin: &str, https_redirect: bool) -> String {
    let https_redirect = if https_redirect {
        formatdoc! {"

            RewriteEngine On
            RewriteCond %{{HTTP:X-Forwarded-Proto}} !https
            RewriteRule ^ https://%{{HTTP_HOST}}%{{REQUEST_URI}} [R=301,L]
        "}
    } else {
        String::new()
    };

    formatdoc! {r#"
        ServerRoot "${{SERVER_ROOT}}"
        Listen "${{PORT}}"
        ServerAdmin "{server_admin}"
        ServerName "0.0.0.0"
        DocumentRoot "{document_root}"

        LoadModule mpm_event_module modules/mod_mpm_event.so
        LoadModule authz_core_module modules/mod_authz_core.so
        LoadModule authz_host_module modules/mod_authz_host.so
        LoadModule dir_module modules/mod_dir.so
        LoadModule mime_module modules/mod_mime.so
        LoadModule log_config_module modules/mod_log_config.so
        LoadModule headers_module modules/mod_headers.so
        LoadModule setenvif_module modules/mod_setenvif.so
        LoadModule unixd_module modules/mod_unixd.so
        LoadModule remoteip_module modules/mod_remoteip.so
        LoadModule rewrite_module modules/mod_rewrite.so
        LoadModule proxy_module modules/mod_proxy.so
        LoadModule proxy_fcgi_module modules/mod_proxy_fcgi.so

        TypesConfig conf/mime.types
        PidFile /tmp/httpd.pid
        ErrorLog /proc/self/fd/2
        LogFormat "%a %l %u %t \"%r\" %>s %b" common
        CustomLog /proc/self/fd/1 common

        RemoteIPHeader x-forwarded-for
        RemoteIPInternalProxy 10.0.0.0/8 172.16.0.0/12 192.168.0.0/16

        <Directory />
            AllowOverride None
            Require all denied
        </Directory>

        <Directory "{document_root}">
            Options SymLinksIfOwnerMatch
            AllowOverride All
            Require all granted
        </Directory>

        <Files ".ht*">
            Require all denied
        </Files>

        DirectoryIndex index.php index.html index.htm

        <FilesMatch "\.php$">
            SetHandler "proxy:fcgi://{PHP_FPM_LISTEN}"
        </FilesMatch>
        {https_redirect}"#,
        document_root = document_root.display()
    }
}

pub(crate) fn nginx_conf(document_root: &Path, https_redirect: bool) -> String {
    let https_redirect = if https_redirect {
        formatdoc! {"
            if ($http_x_forwarded_proto != \"https\") {{
                        return 301 https://$host$request_uri;
                    }}
        "}
    } else {
        String::new()
    };

    formatdoc! {r#"
        daemon off;
        worker_processes auto;
        pid /tmp/nginx.pid;
        error_log stderr;

        events {{
            worker_connections 1024;
        }}

        http {{
            types {{
                text/html html htm;
                text/css css;
                text/plain txt;
                application/javascript js;
                application/json json;
                image/png png;
                image/jpeg jpeg jpg;
                image/gif gif;
                image/svg+xml svg;
            }}
            default_type application/octet-stream;
            access_log /dev/stdout;
            sendfile on;
            keepalive_timeout 65;

            server {{
                listen {{{{port}}}};
                root {document_root};
                index index.php index.html index.htm;
                {https_redirect}
                location / {{
                    try_files $uri $uri/ /index.php?$query_string;
                }}

                location ~ \.php$ {{
                    try_files $uri =404;
                    fastcgi_split_path_info ^(.+\.php)(/.+)$;
                    fastcgi_pass {PHP_FPM_LISTEN};
                    fastcgi_index index.php;
                    fastcgi_param SCRIPT_FILENAME $document_root$fastcgi_script_name;
                    fastcgi_param PATH_INFO $fastcgi_path_info;
                    fastcgi_param QUERY_STRING $query_string;
                    fastcgi_param REQUEST_METHOD $request_method;
                    fastcgi_param CONTENT_TYPE $content_type;
                    fastcgi_param CONTENT_LENGTH $content_length;
                    fastcgi_param REQUEST_URI $request_uri;
                    fastcgi_param DOCUMENT_ROOT $document_root;
                    fastcgi_param SERVER_PROTOCOL $server_protocol;
                    fastcgi_param REMOTE_ADDR $remote_addr;
                    fastcgi_param SERVER_NAME $server_name;
                    fastcgi_param SERVER_PORT $server_port;
                    fastcgi_param HTTPS $https if_not_empty;
                }}

                location ~ /\.ht {{
                    deny all;
                }}
            }}
        }}
    "#, document_root = document_root.display()}
}
